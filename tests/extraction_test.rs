// End-to-end extraction scenarios

use rumpsteak_extraction::{
    Behaviour, ChoreographyBody, ExtractionConfig, ExtractionError, ExtractionResult, Extractor, Network, NetworkError,
    ProcessTerm, Strategy,
};
use std::collections::BTreeSet;
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn no_args() -> Vec<String> {
    Vec::new()
}

fn term(main: Behaviour) -> ProcessTerm {
    ProcessTerm::new(main)
}

fn recursive(name: &str, body: Behaviour) -> ProcessTerm {
    ProcessTerm::new(Behaviour::call(name, no_args())).with_procedure(name, no_args(), body)
}

fn extract(network: &Network) -> anyhow::Result<String> {
    init_tracing();
    Ok(Extractor::default().extract(network)?.to_string())
}

#[test]
fn test_single_communication() -> anyhow::Result<()> {
    let network = Network::new([
        ("p", term(Behaviour::send("q", "e", Behaviour::Terminate))),
        ("q", term(Behaviour::receive("p", Behaviour::Terminate))),
    ]);
    assert_eq!(extract(&network)?, "main {p.e->q; stop}");
    Ok(())
}

#[test]
fn test_independent_links_extract_separately() -> anyhow::Result<()> {
    let network = Network::new([
        ("a", term(Behaviour::send("b", "e", Behaviour::Terminate))),
        ("b", term(Behaviour::receive("a", Behaviour::Terminate))),
        ("c", term(Behaviour::send("d", "e2", Behaviour::Terminate))),
        ("d", term(Behaviour::receive("c", Behaviour::Terminate))),
    ]);
    let program = Extractor::default().extract(&network)?;
    assert_eq!(program.components.len(), 2);
    assert_eq!(program.to_string(), "main {a.e->b; stop} || main {c.e2->d; stop}");
    Ok(())
}

#[test]
fn test_ping_pong_becomes_single_procedure() -> anyhow::Result<()> {
    let network = Network::new([
        (
            "a",
            recursive(
                "X",
                Behaviour::send("b", "ping", Behaviour::receive("b", Behaviour::call("X", no_args()))),
            ),
        ),
        (
            "b",
            recursive(
                "Y",
                Behaviour::receive("a", Behaviour::send("a", "pong", Behaviour::call("Y", no_args()))),
            ),
        ),
    ]);
    assert_eq!(extract(&network)?, "def X1 { a.ping->b; b.pong->a; X1 } main {X1}");
    Ok(())
}

#[test]
fn test_independent_action_stays_outside_conditional() -> anyhow::Result<()> {
    let network = Network::new([
        (
            "p",
            term(Behaviour::branch(
                "e",
                Behaviour::send("q", "1", Behaviour::Terminate),
                Behaviour::send("q", "2", Behaviour::Terminate),
                Behaviour::Terminate,
            )),
        ),
        (
            "q",
            term(Behaviour::send("r", "m", Behaviour::receive("p", Behaviour::Terminate))),
        ),
        ("r", term(Behaviour::receive("q", Behaviour::Terminate))),
    ]);
    assert_eq!(
        extract(&network)?,
        "main {q.m->r; if p.e then p.1->q; stop else p.2->q; stop}"
    );

    let conditions_first = ExtractionConfig::default().with_strategy(Strategy::ConditionsFirst);
    let program = Extractor::new(conditions_first).extract(&network)?;
    assert_eq!(
        program.to_string(),
        "main {if p.e then q.m->r; p.1->q; stop else q.m->r; p.2->q; stop}"
    );
    Ok(())
}

#[test]
fn test_recursive_choice() -> anyhow::Result<()> {
    let network = Network::new([
        (
            "a",
            recursive(
                "X",
                Behaviour::branch(
                    "e",
                    Behaviour::select("b", "L", Behaviour::send("b", "x", Behaviour::call("X", no_args()))),
                    Behaviour::select("b", "R", Behaviour::Terminate),
                    Behaviour::Terminate,
                ),
            ),
        ),
        (
            "b",
            recursive(
                "Y",
                Behaviour::offer(
                    "a",
                    [
                        ("L", Behaviour::receive("a", Behaviour::call("Y", no_args()))),
                        ("R", Behaviour::Terminate),
                    ],
                    Behaviour::Terminate,
                ),
            ),
        ),
    ]);
    assert_eq!(
        extract(&network)?,
        "def X1 { if a.e then a->b[L]; a.x->b; X1 else a->b[R]; stop } main {X1}"
    );
    Ok(())
}

#[test]
fn test_selection_then_reply() -> anyhow::Result<()> {
    let network = Network::new([
        (
            "p",
            term(Behaviour::select("q", "L", Behaviour::receive("q", Behaviour::Terminate))),
        ),
        (
            "q",
            term(Behaviour::offer(
                "p",
                [
                    ("L", Behaviour::send("p", "x", Behaviour::Terminate)),
                    ("R", Behaviour::Terminate),
                ],
                Behaviour::Terminate,
            )),
        ),
    ]);
    assert_eq!(extract(&network)?, "main {p->q[L]; q.x->p; stop}");
    Ok(())
}

#[test]
fn test_multicom_swap() -> anyhow::Result<()> {
    let network = Network::new([
        (
            "a",
            term(Behaviour::send("b", "msg1", Behaviour::receive("b", Behaviour::Terminate))),
        ),
        (
            "b",
            term(Behaviour::send("a", "msg2", Behaviour::receive("a", Behaviour::Terminate))),
        ),
    ]);
    assert_eq!(extract(&network)?, "main {(a.msg1->b, b.msg2->a); stop}");

    let program = Extractor::new(ExtractionConfig::default().with_multicom(false)).extract(&network)?;
    assert!(!program.is_extracted());
    assert_eq!(program.to_string(), "<not extractable>");
    Ok(())
}

#[test]
fn test_unacquainted_processes_cannot_interact() -> anyhow::Result<()> {
    let network = Network::strangers([
        ("a", term(Behaviour::send("b", "e", Behaviour::Terminate))),
        ("b", term(Behaviour::receive("a", Behaviour::Terminate))),
    ]);
    let program = Extractor::default().extract(&network)?;
    assert!(matches!(
        program.components.as_slice(),
        [ExtractionResult::NotExtractable { .. }]
    ));
    Ok(())
}

#[test]
fn test_introduction_enables_interaction() -> anyhow::Result<()> {
    let mut network = Network::strangers([
        (
            "a",
            term(Behaviour::introductee("c", "x", Behaviour::send("x", "e", Behaviour::Terminate))),
        ),
        (
            "b",
            term(Behaviour::introductee("c", "y", Behaviour::receive("y", Behaviour::Terminate))),
        ),
        ("c", term(Behaviour::introduce("a", "b", Behaviour::Terminate))),
    ]);
    network.introduce("c", "a");
    network.introduce("c", "b");
    assert_eq!(extract(&network)?, "main {c.a<->b; a.e->b; stop}");
    Ok(())
}

#[test]
fn test_spawned_child_talks_to_parent() -> anyhow::Result<()> {
    let network = Network::new([(
        "p",
        term(Behaviour::spawn(
            "c",
            Behaviour::receive("p", Behaviour::Terminate),
            Behaviour::send("c", "hi", Behaviour::Terminate),
        )),
    )]);
    assert_eq!(extract(&network)?, "main {p spawns p/c0; p.hi->p/c0; stop}");
    Ok(())
}

#[test]
fn test_starved_process_rejected() -> anyhow::Result<()> {
    let network = Network::new([
        (
            "a",
            recursive("X", Behaviour::send("b", "m", Behaviour::call("X", no_args()))),
        ),
        (
            "b",
            recursive("Y", Behaviour::receive("a", Behaviour::call("Y", no_args()))),
        ),
        ("c", term(Behaviour::receive("a", Behaviour::Terminate))),
    ]);
    let program = Extractor::default().extract(&network)?;
    assert!(!program.is_extracted());
    assert!(program.statistics().bad_loops > 0);

    let services: BTreeSet<String> = ["c".to_string()].into_iter().collect();
    let program = rumpsteak_extraction::extract(&network, &services)?;
    assert_eq!(program.to_string(), "def X1 { a.m->b; X1 } main {X1}");
    Ok(())
}

#[test]
fn test_failed_else_branch_rolls_back_then_branch() -> anyhow::Result<()> {
    let network = Network::new([
        (
            "p",
            term(Behaviour::branch(
                "e",
                Behaviour::send("q", "1", Behaviour::Terminate),
                Behaviour::Terminate,
                Behaviour::Terminate,
            )),
        ),
        ("q", term(Behaviour::receive("p", Behaviour::Terminate))),
    ]);
    let program = Extractor::default().extract(&network)?;
    match program.components.as_slice() {
        [ExtractionResult::NotExtractable { statistics }] => assert_eq!(statistics.nodes, 1),
        other => panic!("unexpected result {:?}", other),
    }
    Ok(())
}

#[test]
fn test_purge_drops_idle_processes() -> anyhow::Result<()> {
    let network = Network::new([
        ("idle", term(Behaviour::Terminate)),
        ("p", term(Behaviour::send("q", "e", Behaviour::Terminate))),
        ("q", term(Behaviour::receive("p", Behaviour::Terminate))),
    ]);
    assert_eq!(extract(&network)?, "main {p.e->q; stop}");

    let unsplit = ExtractionConfig::default().with_purge(false).with_split(false);
    let program = Extractor::new(unsplit).extract(&network)?;
    assert_eq!(program.components.len(), 1);
    assert_eq!(program.to_string(), "main {p.e->q; stop}");
    Ok(())
}

#[test]
fn test_undefined_procedure_is_an_error() {
    let network = Network::new([
        ("p", term(Behaviour::call("Missing", no_args()))),
        ("q", term(Behaviour::receive("p", Behaviour::Terminate))),
    ]);
    let error = Extractor::default().extract(&network).unwrap_err();
    assert_eq!(
        error,
        ExtractionError::Network(NetworkError::UndefinedProcedure {
            process: "p".into(),
            procedure: "Missing".into(),
        })
    );
}

#[test]
fn test_unbounded_spawning_hits_limits() {
    // children wait for a message that never comes, so the network keeps growing
    let network = Network::new([(
        "p",
        recursive(
            "X",
            Behaviour::spawn(
                "c",
                Behaviour::receive("p", Behaviour::Terminate),
                Behaviour::call("X", no_args()),
            ),
        ),
    )]);

    let limited = ExtractionConfig::default().with_max_nodes(50);
    let error = Extractor::new(limited).extract(&network).unwrap_err();
    assert_eq!(error, ExtractionError::NodeLimitExceeded { limit: 50 });

    let deadline = ExtractionConfig::default().with_deadline(Duration::ZERO);
    let error = Extractor::new(deadline).extract(&network).unwrap_err();
    assert!(matches!(error, ExtractionError::DeadlineExceeded { .. }));
}

#[test]
fn test_terminated_children_do_not_block_loops() -> anyhow::Result<()> {
    let network = Network::new([(
        "p",
        recursive(
            "X",
            Behaviour::spawn("c", Behaviour::Terminate, Behaviour::call("X", no_args())),
        ),
    )]);
    assert_eq!(extract(&network)?, "def X1 { p spawns p/c0; X1 } main {X1}");
    Ok(())
}

#[test]
fn test_endless_spawning_is_not_extractable() -> anyhow::Result<()> {
    // a{X = spawn q with X continue X}: every round adds another copy of a
    let network = Network::new([(
        "a",
        recursive(
            "X",
            Behaviour::spawn("q", Behaviour::call("X", no_args()), Behaviour::call("X", no_args())),
        ),
    )]);
    let program = Extractor::default().extract(&network)?;
    assert_eq!(program.to_string(), "<not extractable>");
    assert_eq!(program.statistics().nodes, 1);
    Ok(())
}

#[test]
fn test_worker_loop_is_recursive() -> anyhow::Result<()> {
    // X = spawn w with p?;stop continue w!<job>; X
    let network = Network::new([(
        "p",
        recursive(
            "X",
            Behaviour::spawn(
                "w",
                Behaviour::receive("p", Behaviour::Terminate),
                Behaviour::send("w", "job", Behaviour::call("X", no_args())),
            ),
        ),
    )]);
    assert_eq!(
        extract(&network)?,
        "def X1 { p spawns p/w0; p.job->p/w0; X1 } main {X1}"
    );
    Ok(())
}

#[test]
fn test_loop_closes_under_renaming() -> anyhow::Result<()> {
    // each worker waits for its parent, then hands the same job to a worker of its own
    let relay = |parent: &str, me: &str| Behaviour::call("W", [parent, me]);
    let spawn_worker = |me: &str| {
        Behaviour::spawn(
            "w",
            relay(me, "w"),
            Behaviour::send("w", "go", Behaviour::Terminate),
        )
    };
    let network = Network::new([(
        "p",
        term(spawn_worker("p")).with_procedure(
            "W",
            ["parent", "me"],
            Behaviour::receive("parent", spawn_worker("me")),
        ),
    )]);
    assert_eq!(
        extract(&network)?,
        "def X1(p) { p spawns p/w0; p.go->p/w0; X1(p/w0) } main {X1(p)}"
    );
    Ok(())
}

#[test]
fn test_introduction_inside_multicom() -> anyhow::Result<()> {
    // b and i both start with an output, so only a multicom gets them going
    let mut network = Network::strangers([
        (
            "b",
            term(Behaviour::send(
                "i",
                "m",
                Behaviour::introductee("i", "x", Behaviour::send("x", "hi", Behaviour::Terminate)),
            )),
        ),
        (
            "c",
            term(Behaviour::introductee("i", "y", Behaviour::receive("y", Behaviour::Terminate))),
        ),
        ("i", term(Behaviour::introduce("b", "c", Behaviour::receive("b", Behaviour::Terminate)))),
    ]);
    network.introduce("i", "b");
    network.introduce("i", "c");
    assert_eq!(extract(&network)?, "main {(b.m->i, i.b<->c); b.hi->c; stop}");

    let program = Extractor::new(ExtractionConfig::default().with_multicom(false)).extract(&network)?;
    assert!(!program.is_extracted());
    Ok(())
}

#[test]
fn test_long_linear_protocol() -> anyhow::Result<()> {
    const LENGTH: usize = 1000;
    let (mut sender, mut receiver) = (Behaviour::Terminate, Behaviour::Terminate);
    for i in (0..LENGTH).rev() {
        sender = Behaviour::send("q", format!("m{}", i), sender);
        receiver = Behaviour::receive("p", receiver);
    }
    let network = Network::new([("p", term(sender)), ("q", term(receiver))]);

    init_tracing();
    let program = Extractor::default().extract(&network)?;
    assert_eq!(program.statistics().nodes, LENGTH + 1);

    let choreography = program.choreographies().next().expect("extracted");
    let mut body = &choreography.main;
    let mut expressions = Vec::new();
    while let ChoreographyBody::Communication {
        sender,
        receiver,
        expression,
        continuation,
    } = body
    {
        assert_eq!((sender.as_str(), receiver.as_str()), ("p", "q"));
        expressions.push(expression.clone());
        body = continuation;
    }
    assert_eq!(body, &ChoreographyBody::Termination);
    assert_eq!(expressions.len(), LENGTH);
    assert_eq!(expressions[0], "m0");
    assert_eq!(expressions[LENGTH - 1], format!("m{}", LENGTH - 1));
    Ok(())
}

#[test]
fn test_custom_strategy() -> anyhow::Result<()> {
    let network = Network::new([
        ("a", term(Behaviour::send("b", "x", Behaviour::Terminate))),
        ("b", term(Behaviour::receive("a", Behaviour::receive("c", Behaviour::Terminate)))),
        ("c", term(Behaviour::send("b", "y", Behaviour::Terminate))),
    ]);
    assert_eq!(extract(&network)?, "main {a.x->b; c.y->b; stop}");

    let reversed = |network: &Network, _: &rumpsteak_extraction::Marking| -> Vec<String> {
        let mut names: Vec<String> = network.names().map(str::to_string).collect();
        names.reverse();
        names
    };
    let program = Extractor::with_strategy(ExtractionConfig::default(), reversed).extract(&network)?;
    assert_eq!(program.to_string(), "main {a.x->b; c.y->b; stop}");
    Ok(())
}
