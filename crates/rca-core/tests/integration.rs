//! Cross-module scenarios: contract → automaton → monitor → verdict.

use std::collections::BTreeMap;

use proptest::prelude::*;
use rca_core::{
    BooleanLogic, ClockKind, ClockValuation, Contract, Expr, FuzzyLogic, FuzzySettings, Mode,
    Monitor, MonitorConfig, Sample, SampleFormat, Semantics, Signature, TracePolicy, Transition,
    UnderflowPolicy, Value, VarType, Variable, Verdict, build_monitor, import_contract_json,
};

fn x_only(name: &str) -> Contract {
    let mut c = Contract::new(name);
    c.signature = Signature::new(vec![Variable::input("x", VarType::Int)]);
    c.modes = vec![Mode::new("idle"), Mode::new("Active")];
    c
}

fn x(v: i64) -> BTreeMap<String, Value> {
    BTreeMap::from([("x".to_string(), Value::Int(v))])
}

fn boolean(contract: Contract, config: &MonitorConfig) -> Monitor<BooleanLogic> {
    Monitor::new(contract.build().unwrap(), BooleanLogic, config)
}

/// Scenario A: a single always-enabled self-loop never changes anything.
#[test]
fn self_loop_keeps_one_token() {
    let mut c = Contract::new("Loop");
    c.modes = vec![Mode::new("idle")];
    c.transitions = vec![Transition::new("idle", "idle", Expr::truth(true), Expr::truth(true))];
    let mut m = boolean(c, &MonitorConfig::default());
    for i in 0..50 {
        m.advance(i, i * 2);
        let report = m.update(&BTreeMap::new()).unwrap();
        assert_eq!(report.tokens, 1);
        assert_eq!(report.verdict, Verdict::Running);
    }
}

/// Scenario B: no enabled precondition blames the environment.
#[test]
fn unmet_assumption_blames_environment() {
    let mut c = x_only("B");
    c.transitions = vec![
        Transition::new("idle", "Active", Expr::var("x").gt(Expr::int(0)), Expr::truth(true)),
        Transition::new("Active", "idle", Expr::truth(true), Expr::truth(true)),
    ];
    let mut m = boolean(c, &MonitorConfig::default());
    m.advance(1, 1);
    let report = m.update(&x(0)).unwrap();
    assert!(!report.any_pre);
    assert_eq!(m.verdict(), Verdict::EnvironmentLoses);
}

/// Scenario C: assumption met but guarantee broken blames the system.
#[test]
fn broken_guarantee_blames_system() {
    let mut c = x_only("C");
    c.transitions = vec![Transition::new(
        "idle",
        "Active",
        Expr::truth(true),
        Expr::var("x").gt(Expr::int(0)),
    )];
    let mut m = boolean(c, &MonitorConfig::default());
    m.advance(1, 1);
    let report = m.update(&x(-1)).unwrap();
    assert!(report.any_pre);
    assert_eq!(report.tokens, 0);
    assert_eq!(m.verdict(), Verdict::SystemLoses);
    assert!(m.should_stop());
}

fn deep_clock_read() -> Contract {
    let mut c = Contract::new("D");
    c.signature = Signature::new(vec![Variable::clock("c")]);
    c.modes = vec![Mode::new("idle")];
    c.transitions = vec![
        Transition::new("idle", "idle", Expr::truth(true), Expr::truth(true)),
        Transition::new(
            "idle",
            "idle",
            Expr::truth(true),
            Expr::clock_hist("c", ClockKind::Total, 2).ge(Expr::int(0)),
        ),
    ];
    c.history.insert("c".into(), 2);
    c
}

/// Scenario D: reading two windows back before they exist raises the flag
/// and fails only that guard.
#[test]
fn early_history_read_underflows() {
    let mut m = boolean(deep_clock_read(), &MonitorConfig::default());
    for _ in 0..2 {
        m.advance(1, 0);
        let report = m.update(&BTreeMap::new()).unwrap();
        assert!(report.faults.postcondition_accessed_incorrect_time);
        assert!(!report.faults.precondition_accessed_incorrect_time);
        assert_eq!(report.tokens, 1);
        assert_eq!(report.verdict, Verdict::Running);
    }
    m.advance(1, 0);
    let report = m.update(&BTreeMap::new()).unwrap();
    assert!(!report.faults.any());
    assert_eq!(report.tokens, 2);
}

#[test]
fn default_underflow_policy_reads_zero() {
    let config = MonitorConfig {
        underflow: UnderflowPolicy::Zero,
        ..Default::default()
    };
    let mut m = boolean(deep_clock_read(), &config);
    let report = m.update(&BTreeMap::new()).unwrap();
    assert!(!report.faults.any());
    assert_eq!(report.tokens, 2);
}

#[test]
fn dedup_collapses_identical_branches() {
    let config = MonitorConfig {
        deduplicate: true,
        underflow: UnderflowPolicy::Zero,
        ..Default::default()
    };
    let mut m = boolean(deep_clock_read(), &config);
    let report = m.update(&BTreeMap::new()).unwrap();
    assert_eq!(report.fired, 2);
    assert_eq!(report.tokens, 1);
}

const PUMP: &str = r#"{
    "version": "1",
    "name": "Pump",
    "signature": {"variables": [
        {"name": "HW", "type": "bool", "role": "input"},
        {"name": "P", "type": "bool", "role": "output"},
        {"name": "tP", "role": "clock"}
    ]},
    "modes": [{"name": "dry"}, {"name": "Wet"}],
    "transitions": [
        {"from": "dry", "to": "dry",
         "pre": {"op": "not", "arg": {"op": "var", "name": "HW"}},
         "post": {"op": "not", "arg": {"op": "var", "name": "P"}}},
        {"from": "dry", "to": "Wet",
         "pre": {"op": "var", "name": "HW"},
         "resetClocks": ["tP"]},
        {"from": "Wet", "to": "Wet",
         "pre": {"op": "const", "value": true},
         "post": {"op": "or", "args": [
            {"op": "var", "name": "P"},
            {"op": "lt", "lhs": {"op": "clock", "name": "tP"}, "rhs": {"op": "const", "value": 3}}
         ]}},
        {"from": "Wet", "to": "dry",
         "pre": {"op": "not", "arg": {"op": "var", "name": "HW"}},
         "post": {"op": "not", "arg": {"op": "var", "name": "P"}}}
    ]
}"#;

fn pump_line(line: &str) -> Sample {
    let contract = import_contract_json(PUMP).unwrap();
    Sample::parse(line, &contract.signature, &SampleFormat::default()).unwrap()
}

#[test]
fn pump_deadline_met() {
    let mut m = build_monitor(import_contract_json(PUMP).unwrap(), &MonitorConfig::default())
        .unwrap();
    for line in [
        "t_e=0,t_s=0,HW=0,P=0,",
        "t_e=1,t_s=0,HW=1,P=0,",
        "t_e=1,t_s=0,HW=1,P=0,",
        "t_e=0,t_s=1,HW=1,P=1,",
        "t_e=1,t_s=1,HW=0,P=0,",
    ] {
        let report = m.step(&pump_line(line)).unwrap();
        assert_eq!(report.verdict, Verdict::Running, "{line}");
    }
}

#[test]
fn pump_deadline_missed() {
    let mut m = build_monitor(import_contract_json(PUMP).unwrap(), &MonitorConfig::default())
        .unwrap();
    m.step(&pump_line("t_e=0,t_s=0,HW=1,P=0")).unwrap();
    m.step(&pump_line("t_e=2,t_s=0,HW=1,P=0")).unwrap();
    let report = m.step(&pump_line("t_e=1,t_s=0,HW=1,P=0")).unwrap();
    assert_eq!(report.verdict, Verdict::SystemLoses);
    // Sticky even when the system recovers.
    let report = m.step(&pump_line("t_e=0,t_s=0,HW=0,P=0")).unwrap();
    assert_eq!(report.verdict, Verdict::SystemLoses);
    assert!(m.snapshot().to_string().contains("(SYSTEM LOSES)"));
}

#[test]
fn fuzzy_tolerance_grades_near_miss() {
    let mut settings = FuzzySettings::default();
    settings.tolerance.insert("tP".into(), 3);
    let config = MonitorConfig {
        semantics: Semantics::Fuzzy(settings),
        ..Default::default()
    };
    let mut m = build_monitor(import_contract_json(PUMP).unwrap(), &config).unwrap();
    m.step(&pump_line("t_e=0,t_s=0,HW=1,P=0")).unwrap();
    // tP = 4 against a bound of 3: misses by 2 with tolerance 3.
    let report = m.step(&pump_line("t_e=4,t_s=0,HW=1,P=0")).unwrap();
    assert_eq!(report.verdict, Verdict::Running);
    let snap = m.snapshot();
    let (_, guarantee) = snap.tokens[0].degrees.unwrap();
    approx::assert_relative_eq!(guarantee, 0.5);
}

#[test]
fn fuzzy_monitor_is_generic() {
    let c = import_contract_json(PUMP).unwrap();
    let logic = FuzzyLogic::default().with_tolerance(0, 1);
    let mut m = Monitor::new(c.build().unwrap(), logic, &MonitorConfig::default());
    m.step(&pump_line("t_e=0,t_s=0,HW=0,P=0")).unwrap();
    assert_eq!(m.tokens().len(), 1);
    assert_eq!(m.tokens().iter().next().unwrap().assume, 1.0);
}

const HOLDOFF: &str = r#"{
    "version": "1",
    "name": "Holdoff",
    "signature": {"variables": [
        {"name": "P", "type": "bool", "role": "output"},
        {"name": "tP", "role": "clock"}
    ]},
    "modes": [{"name": "wet"}],
    "transitions": [
        {"from": "wet", "to": "wet",
         "post": {"op": "or", "args": [
            {"op": "var", "name": "P"},
            {"op": "and", "args": [
                {"op": "lt", "lhs": {"op": "clock", "name": "tP"}, "rhs": {"op": "const", "value": 3}},
                {"op": "not", "arg": {"op": "hist", "name": "P", "depth": 1}}
            ]}
         ]}}
    ],
    "history": {"P": 1}
}"#;

#[test]
fn unrecorded_value_history_reads_false() {
    let mut m = build_monitor(import_contract_json(HOLDOFF).unwrap(), &MonitorConfig::default())
        .unwrap();
    let p = |v: bool| BTreeMap::from([("P".to_string(), Value::Bool(v))]);

    m.advance(0, 0);
    let report = m.update(&p(false)).unwrap();
    assert_eq!(report.verdict, Verdict::Running);
    assert_eq!(report.tokens, 1);
    assert!(!report.faults.any());

    m.advance(1, 0);
    assert_eq!(m.update(&p(true)).unwrap().verdict, Verdict::Running);

    // Switched off right after being on: the recorded history now bites.
    m.advance(1, 0);
    let report = m.update(&p(false)).unwrap();
    assert_eq!(report.verdict, Verdict::SystemLoses);
    assert!(!report.faults.any());
}

#[test]
fn monitor_moves_across_threads() {
    let mut m = build_monitor(import_contract_json(PUMP).unwrap(), &MonitorConfig::default())
        .unwrap();
    let handle = std::thread::spawn(move || {
        m.step(&pump_line("t_e=1,t_s=1,HW=0,P=0")).unwrap();
        m.verdict()
    });
    assert_eq!(handle.join().unwrap(), Verdict::Running);
}

// --- Properties ---

/// Nondeterministic contract with a clock: `x > 0` may branch either way.
fn branching(depth: usize) -> Contract {
    let mut c = x_only("Branch");
    c.signature.variables.push(Variable::clock("c"));
    c.transitions = vec![
        Transition::new("idle", "idle", Expr::truth(true), Expr::truth(true)),
        Transition::new("idle", "Active", Expr::var("x").gt(Expr::int(0)), Expr::truth(true))
            .resetting(&["c"]),
        Transition::new(
            "Active",
            "Active",
            Expr::truth(true),
            Expr::clock("c").lt(Expr::int(6)),
        ),
    ];
    c.history.insert("c".into(), depth);
    c
}

fn steps() -> impl Strategy<Value = Vec<(u64, u64, i64)>> {
    prop::collection::vec((0u64..3, 0u64..3, -1i64..3), 1..12)
}

fn token_keys(m: &Monitor<BooleanLogic>) -> Vec<String> {
    let mut keys: Vec<String> = m
        .snapshot()
        .tokens
        .iter()
        .map(|t| format!("{t:?}"))
        .collect();
    keys.sort();
    keys.dedup();
    keys
}

proptest! {
    #[test]
    fn bounded_traces_never_exceed_depth(
        depth in 0usize..4,
        ring in any::<bool>(),
        steps in steps(),
    ) {
        let config = MonitorConfig {
            trace_policy: if ring { TracePolicy::Ring } else { TracePolicy::Bounded },
            ..Default::default()
        };
        let mut m = boolean(branching(depth), &config);
        for (de, ds, v) in steps {
            m.advance(de, ds);
            m.update(&x(v)).unwrap();
            for token in m.tokens().iter() {
                for trace in &token.traces {
                    prop_assert!(!trace.is_empty());
                    prop_assert!(trace.len() <= depth + 1);
                }
            }
        }
    }

    #[test]
    fn reset_clocks_read_zero(steps in steps()) {
        let mut m = boolean(branching(1), &MonitorConfig::default());
        for (de, ds, v) in steps {
            m.advance(de, ds);
            m.update(&x(v)).unwrap();
            if v > 0 {
                let fresh = m
                    .tokens()
                    .iter()
                    .filter(|t| t.mode == 1)
                    .any(|t| t.traces[0].current() == ClockValuation::ZERO);
                prop_assert!(fresh);
            }
        }
    }

    #[test]
    fn time_only_moves_forward(deltas in prop::collection::vec((0u64..100, 0u64..100), 1..20)) {
        let mut c = Contract::new("Clock");
        c.signature = Signature::new(vec![Variable::clock("c")]);
        c.modes = vec![Mode::new("idle")];
        c.transitions = vec![Transition::new("idle", "idle", Expr::truth(true), Expr::truth(true))];
        let mut m = boolean(c, &MonitorConfig::default());
        let (mut env, mut sys) = (0, 0);
        for (de, ds) in deltas {
            let before = m.tokens().iter().next().unwrap().traces[0].current().total();
            m.advance(de, ds);
            env += de;
            sys += ds;
            let now = m.tokens().iter().next().unwrap().traces[0].current();
            prop_assert!(now.total() >= before);
            prop_assert_eq!(now, ClockValuation::new(env, sys));
            m.update(&BTreeMap::new()).unwrap();
        }
    }

    #[test]
    fn dedup_matches_plain_up_to_duplicates(steps in steps()) {
        let mut plain = boolean(branching(2), &MonitorConfig::default());
        let mut dedup = boolean(
            branching(2),
            &MonitorConfig { deduplicate: true, ..Default::default() },
        );
        for (de, ds, v) in steps {
            plain.advance(de, ds);
            dedup.advance(de, ds);
            let a = plain.update(&x(v)).unwrap();
            let b = dedup.update(&x(v)).unwrap();
            prop_assert_eq!(a.verdict, b.verdict);
            prop_assert!(b.tokens <= a.tokens);
            prop_assert_eq!(token_keys(&plain), token_keys(&dedup));
        }
    }

    #[test]
    fn verdict_is_sticky(values in prop::collection::vec(-2i64..3, 1..20)) {
        let mut c = x_only("Sticky");
        c.transitions = vec![
            Transition::new("idle", "Active", Expr::var("x").gt(Expr::int(0)), Expr::var("x").lt(Expr::int(2))),
            Transition::new("Active", "idle", Expr::truth(true), Expr::truth(true)),
        ];
        let mut m = boolean(c, &MonitorConfig::default());
        let mut settled: Option<Verdict> = None;
        for v in values {
            let report = m.update(&x(v)).unwrap();
            if let Some(first) = settled {
                prop_assert_eq!(report.verdict, first);
            } else if report.verdict != Verdict::Running {
                settled = Some(report.verdict);
            }
        }
    }
}
