use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use common::config::{FallbackPolicy, RecencyPolicy};
use common::dataset::parse_datasets;
use common::testing::TestConfigBuilder;
use common::{
    BusinessPriority, DatasetMetadata, EgressPattern, LatencySensitivity, StorageCatalog,
    StorageOption,
};
use placement::{
    PlacementError, PlacementSelector, RecommendationEngine, Tier, TierClassifier, estimate_cost,
    pick_cheapest,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn engine() -> RecommendationEngine {
    RecommendationEngine::new(Arc::new(StorageCatalog::builtin()))
}

struct Sample {
    size_gb: f64,
    access_count_30d: u64,
    age: Duration,
    sensitivity: LatencySensitivity,
    egress: EgressPattern,
    priority: u8,
}

impl Sample {
    fn build(&self, name: &str) -> DatasetMetadata {
        DatasetMetadata {
            name: name.to_string(),
            size_gb: self.size_gb,
            access_count_30d: self.access_count_30d,
            last_accessed: now() - self.age,
            current_location: None,
            latency_sensitivity: self.sensitivity,
            egress_pattern: self.egress,
            business_priority: BusinessPriority::new(self.priority).unwrap(),
        }
    }
}

#[test]
fn test_busy_latency_critical_dataset_goes_on_prem() {
    let dataset = Sample {
        size_gb: 75.0,
        access_count_30d: 800,
        age: Duration::zero(),
        sensitivity: LatencySensitivity::Critical,
        egress: EgressPattern::High,
        priority: 1,
    }
    .build("realtime-analytics-stream");

    let report = engine().evaluate_at(&dataset, now()).unwrap();
    assert_eq!(report.recommendation.tier, Tier::Hot);
    assert!(!report.fell_back);

    let catalog = StorageCatalog::builtin();
    let viable: Vec<_> = catalog
        .iter()
        .filter(|option| option.avg_latency_ms <= 50.0)
        .collect();
    assert_eq!(viable.len(), 1);
    assert_eq!(report.recommendation.recommended_location, viable[0].id);
    assert_eq!(report.recommendation.estimated_monthly_cost, 247.5);
}

#[test]
fn test_dead_archive_goes_to_cheapest_storage() {
    let dataset = Sample {
        size_gb: 1000.0,
        access_count_30d: 0,
        age: Duration::days(365),
        sensitivity: LatencySensitivity::Low,
        egress: EgressPattern::Low,
        priority: 5,
    }
    .build("2019-customer-backup");

    let report = engine().evaluate_at(&dataset, now()).unwrap();
    assert_eq!(report.score.total(), 20.0);
    assert_eq!(report.recommendation.tier, Tier::Cold);

    let cheapest_storage = StorageCatalog::builtin()
        .iter()
        .min_by(|a, b| {
            a.storage_cost_per_gb_month
                .total_cmp(&b.storage_cost_per_gb_month)
        })
        .map(|option| option.id.clone())
        .unwrap();
    assert_eq!(report.recommendation.recommended_location, cheapest_storage);
    assert_eq!(report.recommendation.recommended_location, "aws-glacier");
}

#[test]
fn test_stale_unused_datasets_by_priority() {
    let classifier = TierClassifier::default();
    for days in [91, 180, 365, 1000] {
        let lowest = Sample {
            size_gb: 10.0,
            access_count_30d: 0,
            age: Duration::days(days),
            sensitivity: LatencySensitivity::Low,
            egress: EgressPattern::Low,
            priority: 5,
        };
        assert_eq!(
            classifier.classify_at(&lowest.build("stale"), now()),
            Tier::Cold
        );

        // Priority 4 alone contributes 40, above the cold threshold.
        let fourth = Sample {
            priority: 4,
            ..lowest
        };
        assert_eq!(
            classifier.classify_at(&fourth.build("stale"), now()),
            Tier::Warm
        );
    }
}

#[test]
fn test_critical_priority_one_only_sees_fast_options() {
    let selector = PlacementSelector::default();
    let catalog = StorageCatalog::builtin();
    for tier in [Tier::Hot, Tier::Warm, Tier::Cold] {
        let viable = selector
            .select_viable(tier, LatencySensitivity::Critical, &catalog)
            .unwrap();
        assert!(!viable.options.is_empty());
        assert!(viable.options.iter().all(|o| o.avg_latency_ms <= 50.0));
    }

    let slow = StorageCatalog::new(vec![
        StorageOption::new("s3", "S3", 2.3, 9.0, 100.0),
        StorageOption::new("r2", "R2", 1.5, 0.0, 150.0),
    ])
    .unwrap();
    let viable = selector
        .select_viable(Tier::Hot, LatencySensitivity::Critical, &slow)
        .unwrap();
    assert!(viable.fell_back);
    assert_eq!(viable.options.len(), slow.len());
}

#[test]
fn test_pick_cheapest_never_loses_to_another_viable_option() {
    let catalog = StorageCatalog::builtin();
    let options: Vec<&StorageOption> = catalog.iter().collect();
    for egress in [EgressPattern::High, EgressPattern::Medium, EgressPattern::Low] {
        for size_gb in [0.5, 10.0, 250.0, 5000.0] {
            let dataset = Sample {
                size_gb,
                access_count_30d: 0,
                age: Duration::zero(),
                sensitivity: LatencySensitivity::Low,
                egress,
                priority: 3,
            }
            .build("cheap");
            let best = pick_cheapest(&dataset, &options).unwrap();
            let best_cost = estimate_cost(&dataset, best);
            assert!(
                options
                    .iter()
                    .all(|option| best_cost <= estimate_cost(&dataset, option))
            );
        }
    }
}

#[test]
fn test_mixed_portfolio_from_json() {
    let stamp = |days: i64| (now() - Duration::days(days)).to_rfc3339();
    let raw = format!(
        r#"{{
            "cdn-static-assets": {{
                "name": "cdn-static-assets", "sizeGB": 300, "accessCount30d": 1200,
                "lastAccessed": "{}", "currentLocation": "aws-s3-vanilla",
                "latencySensitivity": "medium", "egressPattern": "high", "businessPriority": 2
            }},
            "user-profile-data": {{
                "name": "user-profile-data", "sizeGB": 25, "accessCount30d": 400,
                "lastAccessed": "{}", "currentLocation": "cloudflare-r2",
                "latencySensitivity": "high", "egressPattern": "medium", "businessPriority": 1
            }},
            "legacy-analytics-data": {{
                "name": "legacy-analytics-data", "sizeGB": 200, "accessCount30d": 1,
                "lastAccessed": "{}", "currentLocation": "aws-s3-vanilla",
                "latencySensitivity": "low", "egressPattern": "low", "businessPriority": 5
            }},
            "compliance-audit-logs": {{
                "name": "compliance-audit-logs", "sizeGB": 300, "accessCount30d": 2,
                "lastAccessed": "{}", "currentLocation": "cloudflare-r2",
                "latencySensitivity": "low", "egressPattern": "low", "businessPriority": 4
            }},
            "disaster-recovery": {{
                "name": "disaster-recovery", "sizeGB": 100, "accessCount30d": 0,
                "lastAccessed": "{}", "currentLocation": "aws-glacier",
                "latencySensitivity": "critical", "egressPattern": "low", "businessPriority": 1
            }}
        }}"#,
        stamp(0),
        stamp(1),
        stamp(90),
        stamp(60),
        stamp(180),
    );

    let datasets = parse_datasets(&raw).unwrap();
    assert_eq!(datasets.len(), 5);

    let engine = engine();
    let placed = |name: &str| {
        let dataset = datasets.iter().find(|d| d.name == name).unwrap();
        engine.evaluate_at(dataset, now()).unwrap()
    };

    let cdn = placed("cdn-static-assets");
    assert_eq!(cdn.recommendation.tier, Tier::Hot);
    assert_eq!(cdn.recommendation.recommended_location, "cloudflare-r2");
    assert!(cdn.needs_migration());

    let profiles = placed("user-profile-data");
    assert_eq!(profiles.recommendation.recommended_location, "cloudflare-r2");
    assert!(!profiles.needs_migration());

    let legacy = placed("legacy-analytics-data");
    assert_eq!(legacy.recommendation.tier, Tier::Cold);
    assert_eq!(legacy.recommendation.recommended_location, "aws-glacier");
    assert!(legacy.monthly_savings.unwrap() > 0.0);

    let audit = placed("compliance-audit-logs");
    assert_eq!(audit.recommendation.tier, Tier::Warm);
    assert_eq!(audit.recommendation.recommended_location, "cloudflare-r2");

    let dr = placed("disaster-recovery");
    assert_eq!(dr.recommendation.tier, Tier::Hot);
    assert_eq!(dr.recommendation.recommended_location, "minio-on-prem");
    assert!(dr.needs_migration());
}

#[test]
fn test_policies_from_configuration() {
    let config = TestConfigBuilder::new()
        .with_options(vec![StorageOption::new("s3", "S3", 2.3, 9.0, 100.0)])
        .with_fallback(FallbackPolicy::Strict)
        .with_recency(RecencyPolicy::Unclamped)
        .build();
    let engine = RecommendationEngine::from_config(
        Arc::new(config.catalog().unwrap()),
        &config.placement,
    );

    let dataset = Sample {
        size_gb: 1.0,
        access_count_30d: 0,
        age: Duration::zero(),
        sensitivity: LatencySensitivity::Critical,
        egress: EgressPattern::Low,
        priority: 5,
    }
    .build("strict");
    assert!(matches!(
        engine.recommend_at(&dataset, now()),
        Err(PlacementError::NoViableOption { .. })
    ));

    let relaxed = Sample {
        size_gb: 1.0,
        access_count_30d: 0,
        age: Duration::days(-10),
        sensitivity: LatencySensitivity::High,
        egress: EgressPattern::Low,
        priority: 5,
    }
    .build("future");
    let report = engine.evaluate_at(&relaxed, now()).unwrap();
    // Unclamped recency: (30 + 10) * 2 = 80, plus 20 for priority 5.
    assert_eq!(report.score.recency, 80.0);
    assert_eq!(report.recommendation.tier, Tier::Hot);
}
