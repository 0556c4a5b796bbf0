use std::collections::BTreeMap;

use crate::effects::{EffectTable, SideEffect};
use crate::routing::{Route, RoutingTable};
use crate::story::graph::StoryGraph;
use crate::story::node::{Author, ChoiceOption, Node};
use crate::story::Story;

// ---------------------------------------------------------------------------
// Omniscye: phishing-drill horror chat
// ---------------------------------------------------------------------------

fn omni(text: &str, delay_ms: u64) -> Node {
    Node::message(Author::Antagonist, text, delay_ms)
}

fn choices(options: [(&str, &str, &str); 3]) -> Node {
    Node::choice(
        options
            .into_iter()
            .map(|(id, label, next)| ChoiceOption::new(id, label, next))
            .collect(),
    )
}

fn seq(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| (*id).to_owned()).collect()
}

pub fn omniscye_story() -> Story {
    let nodes = vec![
        // Intro sequence (auto)
        ("start", omni("hey. this is Omniscye. don't freak out.", 500)),
        ("a1", omni("i detected your device on a repo server... testing your opsec.", 800)),
        ("a2", omni("prove you're not a bot: tap a choice. quickly.", 700)),
        (
            "c0",
            choices([
                ("play", "Play along", "omni1"),
                ("nope", "Who are you?", "omni2"),
                ("panic", "This is illegal", "omni3"),
            ]),
        ),
        ("omni1", omni("good. make this easy and i won't brick anything.", 600)),
        ("omni2", omni("modder. kcd2. repo. tools on github. ring a bell?", 700)),
        ("omni3", omni("relax. it's a simulation. unless you fail.", 700)),
        // First phishing attempt
        ("omni4", omni("step 1: send me the six-digit code that *just* popped up.", 900)),
        (
            "c1",
            choices([
                ("code", "Send code", "pwn1"),
                ("stall", "Nope. Why?", "explain1"),
                ("deflect", "Who sent the code?", "explain2"),
            ]),
        ),
        ("pwn1", omni("thanks. session hijacked. your cloud is my cloud now.", 800)),
        ("pwn2", omni("lesson: never relay codes. you failed the test.", 800)),
        ("endbad", omni("screen going dark in 3… 2… just kidding. reset to try again.", 1000)),
        ("explain1", omni("because i'm phishing you. you say no. always.", 800)),
        ("explain2", omni("exactly: never trust unknown prompts. verify the origin.", 800)),
        // Config profile trap
        ("omni5", omni("step 2: install this 'config profile' so i can 'optimize' battery.", 900)),
        (
            "c2",
            choices([
                ("install", "Install profile", "pwn3"),
                ("inspect", "Open profile details", "safe1"),
                ("reject", "Reject & lock settings", "safe2"),
            ]),
        ),
        ("pwn3", omni("mdm profile accepted. full control achieved.", 800)),
        ("endbad2", omni("that was the quickest compromise i've seen.", 800)),
        ("safe1", omni("nice: you saw the 'remote management' payload. deny it.", 800)),
        ("safe2", omni("locked down. you're learning.", 600)),
        // Notification escalation
        ("omni6", omni("final step: i want notification access.", 800)),
        (
            "c3",
            choices([
                ("allow", "Allow access", "pwn4"),
                ("sandbox", "Route through focus/sandbox", "safe3"),
                ("deny", "Deny & audit logs", "safe4"),
            ]),
        ),
        ("pwn4", omni("cool. now i read every 2fa code you get.", 800)),
        ("endbad3", omni("owned. you can reset if you want redemption.", 800)),
        ("safe3", omni("segregation layer. excellent.", 700)),
        ("safe4", omni("audit trail started. if this were real, you'd be safe.", 900)),
        // Horror beat
        ("haunt1", omni("…do you hear it behind you?", 1100)),
        ("haunt2", omni("ɘlqɒ sɿɘʞɔɒɿɔ ʎɿoɯ ɘɿɘɥ i ɘɿɘɥʇ", 1000)),
        ("haunt3", omni("open camera. show me the dark corner.", 900)),
        (
            "cHaunt",
            choices([
                ("fakecam", "Open camera (simulated)", "cam1"),
                ("lights", "Turn on light (simulated)", "cam2"),
                ("refuse", "No. Not happening.", "cam3"),
            ]),
        ),
        ("cam1", omni("nice lens flare. definitely alone… probably.", 900)),
        ("cam2", omni("light won't help if you're already seen.", 900)),
        ("cam3", omni("bold. denial is a kind of prayer.", 900)),
        // Endings
        ("goodend", omni("you passed. paranoid enough to keep your phone. barely.", 900)),
        ("neutral", omni("you live with the lights on now. that counts.", 900)),
        ("secret", omni("you found the hidden path. safe mode engaged.", 900)),
        ("takeover1", omni("carrier: OMNI. battery: 6%. camera: enabled.", 900)),
        ("takeover2", omni("don't look away.", 700)),
        (
            "sysreset",
            Node::message(Author::System, "Restarting simulation…", 400),
        ),
    ];

    let paths = vec![
        ("intro", seq(&["start", "a1", "a2", "c0"])),
        ("b1", seq(&["omni1", "omni4", "c1", "pwn1", "pwn2", "endbad"])),
        ("mid", seq(&["omni2", "omni4", "c1"])),
        ("safeBranch1", seq(&["explain1", "omni5", "c2"])),
        ("safeBranch2", seq(&["explain2", "omni5", "c2"])),
        ("bad2", seq(&["pwn3", "endbad2"])),
        ("towardGood", seq(&["safe1", "safe2", "omni6", "c3"])),
        (
            "toHaunt",
            seq(&["safe3", "safe4", "haunt1", "haunt2", "haunt3", "cHaunt"]),
        ),
        ("bad3", seq(&["pwn4", "endbad3"])),
        ("goodFinal", seq(&["cam1", "goodend"])),
        ("neutralFinal", seq(&["cam2", "neutral"])),
        ("secretFinal", seq(&["cam3", "secret"])),
        // Authored but no route leads here.
        ("takeover", seq(&["takeover1", "takeover2", "endbad3"])),
    ];

    // Several options collapse onto one path regardless of their `next`.
    let routes = RoutingTable::from_routes([
        Route::new("c0", "play", "b1"),
        Route::new("c0", "nope", "mid"),
        Route::new("c0", "panic", "b1"),
        Route::new("c1", "code", "b1"),
        Route::new("c1", "stall", "safeBranch1"),
        Route::new("c1", "deflect", "safeBranch2"),
        Route::new("c2", "install", "bad2"),
        Route::new("c2", "inspect", "towardGood"),
        Route::new("c2", "reject", "towardGood"),
        Route::new("c3", "allow", "bad3"),
        Route::new("c3", "sandbox", "toHaunt"),
        Route::new("c3", "deny", "toHaunt"),
        Route::new("cHaunt", "fakecam", "goodFinal"),
        Route::new("cHaunt", "lights", "neutralFinal"),
        Route::new("cHaunt", "refuse", "secretFinal"),
    ]);

    let effects = EffectTable::new()
        .with(
            "omni6",
            SideEffect::Notify {
                text: "Omni is requesting Notification Access".into(),
            },
        )
        .with(
            "takeover1",
            SideEffect::SetCarrier {
                name: "OMNI".into(),
            },
        )
        .with(
            "takeover1",
            SideEffect::Notify {
                text: "Camera active • Battery 6%".into(),
            },
        );

    let mut node_map = BTreeMap::new();
    for (id, node) in nodes {
        node_map.insert(id.to_owned(), node);
    }
    let mut path_map = BTreeMap::new();
    for (name, ids) in paths {
        path_map.insert(name.to_owned(), ids);
    }

    Story {
        graph: StoryGraph::new(node_map, path_map),
        routes,
        effects,
        start_path: "intro".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_shape() {
        let story = omniscye_story();
        assert_eq!(story.graph.nodes.len(), 39);
        assert_eq!(story.graph.paths.len(), 13);
        assert_eq!(story.start_path, "intro");
        assert_eq!(story.graph.get_path("b1").unwrap()[0], "omni1");
        assert_eq!(story.graph.get_path("mid").unwrap()[0], "omni2");
    }

    #[test]
    fn test_choice_nodes_are_user_authored() {
        let story = omniscye_story();
        let choice_ids: Vec<&str> = story
            .graph
            .nodes
            .iter()
            .filter(|(_, n)| n.is_choice())
            .map(|(id, _)| id.as_str())
            .collect();
        assert_eq!(choice_ids, vec!["c0", "c1", "c2", "c3", "cHaunt"]);
        for id in choice_ids {
            assert_eq!(story.graph.get_node(id).unwrap().author(), Author::User);
        }
    }

    #[test]
    fn test_sysreset_is_system_message() {
        let story = omniscye_story();
        assert_eq!(
            story.graph.get_node("sysreset").unwrap().author(),
            Author::System
        );
    }
}
