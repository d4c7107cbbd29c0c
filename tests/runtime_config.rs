//==============================================
// File: tests/runtime_config.rs
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Runner and configuration integration
// Objective: Load TOML from disk, run scripts through ScriptRunner and check
//            the JSON execution report
//==============================================

use std::fs;

use rulescript::{EngineConfig, ScriptRunner, Value, compile, subscriptions};
use tempfile::tempdir;

const CONFIG: &str = r#"
seed = 1234
max_call_depth = 16

[globals]
difficulty = 12
label = "Goblin"

[owner]
name = "Aria"
attributes = { HP = 20, Strength = 14 }
"#;

#[test]
fn config_file_round_trips_through_disk() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("engine.toml");
    fs::write(&path, CONFIG).unwrap();

    let config = EngineConfig::load(&path).expect("load config");
    assert_eq!(config.seed, Some(1234));

    let copy = dir.path().join("copy.toml");
    config.save(&copy).expect("save config");
    let reloaded = EngineConfig::load(&copy).expect("reload config");
    assert_eq!(reloaded, config);
}

#[test]
fn missing_config_file_reports_its_path() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("absent.toml");
    let err = EngineConfig::load(&path).unwrap_err();
    assert!(format!("{err:#}").contains("absent.toml"), "{err:#}");
}

#[test]
fn runner_seeds_globals_and_owner_from_config() {
    let config = EngineConfig::from_toml_str(CONFIG).unwrap();
    let runner = ScriptRunner::new(config);
    let result = runner.run(
        r#"
check = Owner.Attribute("Strength").value + 2
if check >= difficulty:
    announce("{{label}} is pushed back")
check
"#,
    );

    assert!(result.is_ok(), "{:?}", result.error);
    assert_eq!(result.value, Value::Number(16.0));
    assert_eq!(result.announce_messages, vec!["Goblin is pushed back".to_string()]);
}

#[test]
fn seeded_runs_are_reproducible() {
    let config = EngineConfig::from_toml_str(CONFIG).unwrap();
    let runner = ScriptRunner::new(config);
    let source = "rolls = []\nfor i in 5:\n    rolls.push(roll(\"1d20\"))\nrolls";
    let first = runner.run(source);
    let second = runner.run(source);
    assert_eq!(first.value, second.value);
}

#[test]
fn runs_do_not_share_state() {
    let runner = ScriptRunner::default();
    assert!(runner.run("counter = 1").is_ok());
    let result = runner.run("counter");
    assert!(!result.is_ok());
    assert_eq!(result.to_json()["error"]["code"], "E003");
}

#[test]
fn configured_call_depth_is_enforced() {
    let config = EngineConfig::from_toml_str(CONFIG).unwrap();
    let result = ScriptRunner::new(config).run("spin(n):\n    return spin(n + 1)\nspin(0)");
    let message = result.error.map(|err| err.to_string()).unwrap_or_default();
    assert!(message.starts_with("Maximum call depth of 16 exceeded"), "{message}");
}

#[test]
fn bound_values_are_visible_to_every_run() {
    let runner = ScriptRunner::default().bind("Ruleset", Value::from("Classic"));
    assert_eq!(runner.run("Ruleset").value, Value::from("Classic"));
    assert_eq!(runner.run("\"{{Ruleset}} rules\"").value, Value::from("Classic rules"));
}

#[test]
fn json_report_shape() {
    let result = ScriptRunner::default().run("log(\"dmg\", 3)\nannounce(\"hit\")\n[1, true]");
    let json = result.to_json();
    assert_eq!(json["value"], serde_json::json!([1, true]));
    assert_eq!(json["announceMessages"], serde_json::json!(["hit"]));
    assert_eq!(json["logMessages"], serde_json::json!([["dmg", 3]]));
    assert!(json["error"].is_null());
}

#[test]
fn subscriptions_found_in_nested_blocks() {
    let program = compile(
        "onLevel():\n    subscribe(\"Level\")\nsubscribe(\"HP\")\nsubscribe(\"Level\")\n",
    )
    .unwrap();
    assert_eq!(subscriptions(&program), vec!["Level", "HP"]);
}

//==============================================
// End of file
//==============================================
