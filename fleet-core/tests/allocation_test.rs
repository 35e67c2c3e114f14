//! Allocation properties against the in-memory registry

use fleet_config::InstanceConfig;
use fleet_core::*;

const BASE_PORT: u16 = 11434;

fn allocator(registry: &InMemoryRegistry) -> Allocator<'_, InMemoryRegistry> {
    Allocator::new(
        registry,
        "llm-",
        BASE_PORT,
        LaunchCommand::new("/usr/local/bin/fleet", "bash"),
    )
}

fn count(n: &str) -> InstanceCount {
    InstanceCount::parse(n).unwrap()
}

#[tokio::test]
async fn test_three_instances_on_empty_registry() {
    let registry = InMemoryRegistry::new();
    let report = allocator(&registry).allocate(count("3")).await.unwrap();

    assert_eq!(registry.names(), vec!["llm-11434", "llm-11435", "llm-11436"]);
    assert_eq!(report.launched().count(), 3);
    assert_eq!(report.skipped().count(), 0);

    let ports: Vec<u16> = report.placements.iter().map(Placement::port).collect();
    assert_eq!(ports, vec![11434, 11435, 11436]);

    assert_eq!(
        registry.command_of("llm-11435").as_deref(),
        Some("/usr/local/bin/fleet launch --port=11435; bash")
    );
}

#[tokio::test]
async fn test_sessions_carry_resolved_instance_settings() {
    let instance = InstanceConfig {
        num_parallel: 4,
        keep_alive: "1h".to_string(),
        debug: true,
        ..Default::default()
    };
    let command = LaunchCommand::new("/usr/local/bin/fleet", "bash").with_instance(&instance);
    let registry = InMemoryRegistry::new();
    Allocator::new(&registry, "llm-", BASE_PORT, command)
        .allocate(count("2"))
        .await
        .unwrap();

    for (name, port) in [("llm-11434", "--port=11434"), ("llm-11435", "--port=11435")] {
        let command = registry.command_of(name).unwrap();
        assert!(command.contains(" --parallel=4 "), "{}", command);
        assert!(command.contains(" --keep-alive=1h "), "{}", command);
        assert!(command.contains(" --debug "), "{}", command);
        assert!(command.contains(" --no-flash-attention "), "{}", command);
        assert!(command.contains(port), "{}", command);
    }
}

#[tokio::test]
async fn test_existing_session_is_skipped() {
    let registry = InMemoryRegistry::with_sessions(["llm-11435"]);
    let report = allocator(&registry).allocate(count("3")).await.unwrap();

    assert_eq!(report.launched().count(), 2);
    let skipped: Vec<_> = report.skipped().collect();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].session().as_str(), "llm-11435");

    // The pre-existing session keeps its original command
    assert_eq!(registry.command_of("llm-11435").as_deref(), Some(""));
    assert_eq!(registry.create_calls(), 2);
}

#[tokio::test]
async fn test_exactly_n_existence_checks() {
    for n in [1u16, 4, 9] {
        let registry = InMemoryRegistry::with_sessions(["llm-11434", "llm-11436"]);
        allocator(&registry)
            .allocate(count(&n.to_string()))
            .await
            .unwrap();

        assert_eq!(registry.exists_calls(), usize::from(n));
        assert!(registry.create_calls() <= usize::from(n));
    }
}

#[tokio::test]
async fn test_created_ports_are_range_minus_existing() {
    let registry = InMemoryRegistry::with_sessions(["llm-11434", "llm-11437", "other-11435"]);
    let report = allocator(&registry).allocate(count("5")).await.unwrap();

    let launched: Vec<u16> = report.launched().map(Placement::port).collect();
    assert_eq!(launched, vec![11435, 11436, 11438]);
}

#[tokio::test]
async fn test_create_failure_does_not_stop_the_loop() {
    let registry = InMemoryRegistry::new();
    registry.refuse("llm-11435", "server exited unexpectedly");

    let mut seen = Vec::new();
    let report = allocator(&registry)
        .allocate_with(count("3"), |index, placement| {
            seen.push((index, placement.port()))
        })
        .await
        .unwrap();

    assert_eq!(seen, vec![(0, 11434), (1, 11435), (2, 11436)]);
    assert_eq!(report.failed().count(), 1);
    assert_eq!(registry.names(), vec!["llm-11434", "llm-11436"]);
}

#[test]
fn test_invalid_counts_are_rejected_before_allocation() {
    for bad in ["0", "-1", "three", ""] {
        assert!(InstanceCount::parse(bad).is_err(), "{:?} accepted", bad);
    }
}

#[tokio::test]
async fn test_range_overflow_touches_nothing() {
    let registry = InMemoryRegistry::new();
    let allocator = Allocator::new(
        &registry,
        "llm-",
        65535,
        LaunchCommand::new("fleet", "bash"),
    );

    let err = allocator.allocate(count("2")).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Usage);
    assert_eq!(registry.exists_calls(), 0);
    assert_eq!(registry.create_calls(), 0);
}

#[tokio::test]
async fn test_works_through_trait_object() {
    let registry = InMemoryRegistry::new();
    let dyn_registry: &dyn SessionRegistry = &registry;
    let allocator = Allocator::new(
        dyn_registry,
        "ollama-",
        BASE_PORT,
        LaunchCommand::new("fleet", "bash"),
    );

    allocator.allocate(count("2")).await.unwrap();
    assert_eq!(registry.names(), vec!["ollama-11434", "ollama-11435"]);
}
