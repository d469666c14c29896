//! Comprehensive integration tests for the orchestrator
//!
//! These tests drive whole analysis sessions through mockall-generated mocks,
//! a gated hand-written service, and the in-process Laplace backend.

use std::sync::atomic::Ordering;
use std::time::Duration;

use orchestrator::core::{ComputationKind, EventOutcome};
use orchestrator::services::LocalStatsService;
use orchestrator::{ConfigUpdate, Orchestrator, OrchestratorError};
use shared::Statistic;

mod common;
use common::{GatedStatsService, OrchestratorBuilder, TestFixtures, TestHelpers};

/// Test the full point-estimate path with a stable ranking
#[tokio::test]
async fn test_point_estimate_end_to_end() {
    // Arrange
    let mut orchestrator = OrchestratorBuilder::new()
        .with_stats(|stats| {
            stats
                .expect_compute_stats()
                .withf(|request| {
                    request.epsilon == 1.0
                        && request.group_by.as_deref() == Some("region")
                        && request.statistic == Statistic::Mean
                        && request.column == "sales"
                        && request.data.len() == 5
                })
                .returning(|_| Ok(TestFixtures::stable_stats_response()))
                .times(1);
            stats
                .expect_compute_error_bars()
                .returning(|_| Ok(TestFixtures::error_bars_response()))
                .times(0..);
        })
        .build();
    TestHelpers::configure(&mut orchestrator, 1.0).await;

    // Act
    let result = orchestrator.compute_point_estimate().await.unwrap();

    // Assert
    assert_eq!(result.groups.len(), 3);
    assert_eq!(result.dp_ranking, vec!["B", "A", "C"]);
    assert!(!result.ranking_changed);
    assert!(result.rank_shifts().iter().all(|shift| !shift.moved()));

    let view = orchestrator.view();
    assert!(view.point_estimate_is_fresh());
    assert!(view.point_estimate_error.is_none());
}

/// Test the comparator runs locally on every applied point estimate
#[tokio::test]
async fn test_point_estimate_detects_reordering() {
    let mut orchestrator = OrchestratorBuilder::new()
        .with_stats(|stats| {
            stats
                .expect_compute_stats()
                .returning(|_| Ok(TestFixtures::reordered_stats_response()));
            stats
                .expect_compute_error_bars()
                .returning(|_| Ok(TestFixtures::error_bars_response()));
        })
        .build();
    TestHelpers::configure(&mut orchestrator, 1.0).await;

    let result = orchestrator.compute_point_estimate().await.unwrap();

    assert!(result.ranking_changed, "Service said false but rankings differ");
    let moved: Vec<String> = result
        .rank_shifts()
        .into_iter()
        .filter(|shift| shift.moved())
        .map(|shift| shift.name)
        .collect();
    assert_eq!(moved, vec!["A", "C"]);
}

/// Test a late response from an older epoch never overwrites the current one
#[tokio::test]
async fn test_stale_point_estimate_is_discarded() {
    // Arrange
    let gate = GatedStatsService::default();
    let mut orchestrator = Orchestrator::new(gate.clone(), TestHelpers::empty_cache(), Default::default());
    TestHelpers::configure(&mut orchestrator, 1.0).await;

    let first = orchestrator.request_point_estimate().unwrap();
    orchestrator.update(ConfigUpdate::Epsilon(2.0));
    let second = orchestrator.request_point_estimate().unwrap();
    assert_ne!(first.epoch, second.epoch);
    gate.wait_for_pending(2).await;

    // Act: the newer request finishes first, the older one after it
    let mut pending = gate.take_pending();
    pending.sort_by(|a, b| b.request.epsilon.total_cmp(&a.request.epsilon));
    let mut pending = pending.into_iter();
    pending.next().unwrap().complete(TestFixtures::stable_stats_response());
    pending.next().unwrap().complete(TestFixtures::reordered_stats_response());

    let mut outcomes = Vec::new();
    while outcomes.len() < 2 {
        let event = TestHelpers::wait_for(&mut orchestrator, ComputationKind::PointEstimate).await;
        outcomes.push((event.context.request_id, event.outcome));
    }

    // Assert
    assert!(outcomes.contains(&(second.request_id, EventOutcome::Applied)));
    assert!(outcomes.contains(&(first.request_id, EventOutcome::Discarded)));

    let stored = orchestrator.state().point_estimate().unwrap();
    assert_eq!(stored.epoch, second.epoch);
    assert!(!stored.value.ranking_changed, "Stale reordered response leaked into state");
}

/// Test a failing sweep epsilon is omitted and the rest of the curve survives
#[tokio::test]
async fn test_sweep_omits_failed_epsilon() {
    // Arrange
    let mut orchestrator = OrchestratorBuilder::new()
        .with_stats(|stats| {
            stats.expect_compute_error_bars().returning(|request| {
                if request.epsilon == 0.25 {
                    Err(OrchestratorError::transport("compute-error-bars", "HTTP 503"))
                } else {
                    Ok(TestFixtures::error_bars_with_offset(1.0 / request.epsilon))
                }
            });
        })
        .build();

    // Act
    TestHelpers::configure(&mut orchestrator, TestFixtures::POLL_EPSILON).await;
    TestHelpers::wait_for_applied(&mut orchestrator, ComputationKind::TradeoffSweep).await;

    // Assert
    let curve = &orchestrator.state().tradeoff_curve().unwrap().value;
    assert_eq!(curve.len(), 5);
    assert_eq!(curve.epsilons(), vec![0.1, 0.5, 1.0, 2.0, 5.0]);
    assert!((curve.point_at(0.1).unwrap().rmse - 10.0).abs() < 1e-9);
    assert!((curve.point_at(5.0).unwrap().rmse - 0.2).abs() < 1e-9);
    assert!(orchestrator.view().tradeoff_curve_is_fresh());
}

/// Test sweep points with no groups are omitted like failures
#[tokio::test]
async fn test_sweep_omits_empty_responses() {
    let mut orchestrator = OrchestratorBuilder::new()
        .with_stats(|stats| {
            stats.expect_compute_error_bars().returning(|request| {
                if request.epsilon >= 1.0 {
                    Ok(Default::default())
                } else {
                    Ok(TestFixtures::error_bars_response())
                }
            });
        })
        .build();

    TestHelpers::configure(&mut orchestrator, TestFixtures::POLL_EPSILON).await;
    TestHelpers::wait_for_applied(&mut orchestrator, ComputationKind::TradeoffSweep).await;

    let curve = &orchestrator.state().tradeoff_curve().unwrap().value;
    assert_eq!(curve.epsilons(), vec![0.1, 0.25, 0.5]);
}

/// Test the poll fires immediately and then once per period
#[tokio::test(start_paused = true)]
async fn test_poll_cadence() {
    // Arrange
    let polls = TestHelpers::counter();
    let counter = polls.clone();
    let mut orchestrator = OrchestratorBuilder::new()
        .with_stats(move |stats| {
            stats.expect_compute_error_bars().returning(move |request| {
                if request.epsilon == TestFixtures::POLL_EPSILON {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
                Ok(TestFixtures::error_bars_response())
            });
        })
        .build();

    // Act
    TestHelpers::configure(&mut orchestrator, TestFixtures::POLL_EPSILON).await;
    tokio::time::sleep(Duration::from_millis(3500)).await;

    // Assert: ticks at 0s, 1s, 2s and 3s
    assert_eq!(TestHelpers::count(&polls), 4);
    assert!(orchestrator.poll_active());

    let event = TestHelpers::wait_for_applied(&mut orchestrator, ComputationKind::ConfidenceInterval).await;
    assert_eq!(event.context.epoch, orchestrator.state().epoch());
    let estimate = &orchestrator.state().confidence_intervals().unwrap().value;
    assert_eq!(estimate.len(), 3);
    assert!(estimate.get("B").unwrap().band().contains(21.0));
}

/// Test a failed tick is absorbed and the poll keeps going
#[tokio::test(start_paused = true)]
async fn test_failed_tick_does_not_stop_poll() {
    // Arrange
    let polls = TestHelpers::counter();
    let counter = polls.clone();
    let mut orchestrator = OrchestratorBuilder::new()
        .with_stats(move |stats| {
            stats.expect_compute_error_bars().returning(move |request| {
                if request.epsilon != TestFixtures::POLL_EPSILON {
                    return Ok(TestFixtures::error_bars_response());
                }
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(OrchestratorError::transport("compute-error-bars", "connection reset"))
                } else {
                    Ok(TestFixtures::error_bars_response())
                }
            });
        })
        .build();
    TestHelpers::configure(&mut orchestrator, TestFixtures::POLL_EPSILON).await;

    // Act
    let first = TestHelpers::wait_for(&mut orchestrator, ComputationKind::ConfidenceInterval).await;
    let second = TestHelpers::wait_for(&mut orchestrator, ComputationKind::ConfidenceInterval).await;

    // Assert
    assert!(first.outcome.error().is_some_and(|error| error.is_transport_failure()));
    assert_eq!(second.outcome, EventOutcome::Applied);
    assert!(orchestrator.poll_active());
    assert!(TestHelpers::count(&polls) >= 2);
    assert!(orchestrator.view().confidence_intervals_are_fresh());
}

/// Test teardown stops the poll for good
#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_poll() {
    let polls = TestHelpers::counter();
    let counter = polls.clone();
    let mut orchestrator = OrchestratorBuilder::new()
        .with_stats(move |stats| {
            stats.expect_compute_error_bars().returning(move |request| {
                if request.epsilon == TestFixtures::POLL_EPSILON {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
                Ok(TestFixtures::error_bars_response())
            });
        })
        .build();
    TestHelpers::configure(&mut orchestrator, TestFixtures::POLL_EPSILON).await;
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(TestHelpers::count(&polls), 2);

    orchestrator.shutdown();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert!(!orchestrator.poll_active());
    assert!(!orchestrator.sweep_active());
    assert_eq!(TestHelpers::count(&polls), 2);
}

/// Test dropping the orchestrator stops its background work
#[tokio::test(start_paused = true)]
async fn test_drop_stops_poll() {
    let polls = TestHelpers::counter();
    let counter = polls.clone();
    let mut orchestrator = OrchestratorBuilder::new()
        .with_stats(move |stats| {
            stats.expect_compute_error_bars().returning(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(TestFixtures::error_bars_response())
            });
        })
        .build();
    TestHelpers::configure(&mut orchestrator, TestFixtures::POLL_EPSILON).await;
    tokio::time::sleep(Duration::from_millis(500)).await;

    drop(orchestrator);
    let after_drop = TestHelpers::count(&polls);
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(TestHelpers::count(&polls), after_drop);
}

/// Test the poll stops as soon as the configuration stops being computable
#[tokio::test(start_paused = true)]
async fn test_poll_stops_when_not_computable() {
    let polls = TestHelpers::counter();
    let counter = polls.clone();
    let mut orchestrator = OrchestratorBuilder::new()
        .with_stats(move |stats| {
            stats.expect_compute_error_bars().returning(move |request| {
                if request.epsilon == TestFixtures::POLL_EPSILON {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
                Ok(TestFixtures::error_bars_response())
            });
        })
        .build();
    TestHelpers::configure(&mut orchestrator, TestFixtures::POLL_EPSILON).await;
    tokio::time::sleep(Duration::from_millis(1500)).await;

    orchestrator.update(ConfigUpdate::GroupBy(None));
    let frozen = TestHelpers::count(&polls);
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert!(!orchestrator.poll_active());
    assert!(!orchestrator.view().computable);
    assert_eq!(TestHelpers::count(&polls), frozen);
}

/// Test replacing the dataset resets columns and drops every cached result
#[tokio::test]
async fn test_dataset_replacement_resets_session() {
    // Arrange
    let mut orchestrator = TestHelpers::simple_orchestrator();
    TestHelpers::configure(&mut orchestrator, 1.0).await;
    orchestrator.compute_point_estimate().await.unwrap();
    let before = orchestrator.state().epoch();

    // Act
    let epoch = orchestrator.load_dataset(TestFixtures::CITY_CSV).await.unwrap();

    // Assert
    assert!(epoch > before);
    let view = orchestrator.view();
    assert_eq!(view.columns, vec!["city", "price", "rooms"]);
    assert_eq!(view.configuration.group_by, None);
    assert_eq!(view.configuration.measure, None);
    assert_eq!(view.configuration.epsilon, 1.0);
    assert!(view.point_estimate.is_none());
    assert!(view.confidence_intervals.is_none());
    assert!(view.tradeoff_curve.is_none());
    assert!(!view.computable);
    assert!(!orchestrator.poll_active());

    let error = orchestrator.request_point_estimate().unwrap_err();
    assert!(matches!(error, OrchestratorError::InvalidConfiguration { .. }));
}

/// Test one result group per distinct group label with the offline backend
#[tokio::test]
async fn test_local_backend_groups_match_distinct_labels() {
    let mut orchestrator = Orchestrator::new(
        LocalStatsService::with_seed(11),
        TestHelpers::empty_cache(),
        Default::default(),
    );
    TestHelpers::configure(&mut orchestrator, 1.0).await;

    for statistic in [Statistic::Mean, Statistic::Count, Statistic::Percent] {
        orchestrator.update(ConfigUpdate::Statistic(statistic));
        let result = orchestrator.compute_point_estimate().await.unwrap();

        let distinct = orchestrator.state().dataset().unwrap().distinct_values("region");
        assert_eq!(result.groups.len(), distinct.len(), "{statistic}");
        assert_eq!(result.original_ranking.len(), distinct.len());
    }
}

/// Test the offline backend drives the sweep to a full curve
#[tokio::test]
async fn test_local_backend_builds_full_curve() {
    let mut orchestrator = Orchestrator::new(
        LocalStatsService::with_seed(12),
        TestHelpers::empty_cache(),
        Default::default(),
    );
    TestHelpers::configure(&mut orchestrator, 1.0).await;

    TestHelpers::wait_for_applied(&mut orchestrator, ComputationKind::TradeoffSweep).await;

    let curve = &orchestrator.state().tradeoff_curve().unwrap().value;
    assert_eq!(curve.epsilons(), TestFixtures::SWEEP_EPSILONS.to_vec());
    assert!(curve.points.iter().all(|point| point.rmse >= 0.0));
}
