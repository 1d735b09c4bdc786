//! End-to-end match-and-build scenarios against in-memory collaborators

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use rstest::rstest;
use rust_decimal::Decimal;

use tripmatch::catalog::CatalogSeed;
use tripmatch::config::ScoringConfig;
use tripmatch::itinerary::NameGenerator;
use tripmatch::matching::PackageScorer;
use tripmatch::models::{MealType, PackageStatus, ServiceCategory, ServiceDetails};
use tripmatch::{
    AdvisoryProvider, AdvisoryResult, AdvisoryUnavailable, Collaborators, ErrorKind,
    InMemoryCatalog, MatchOptions, MemoryItineraryStore, Package, PackageCatalog, Requirement,
    Service, TripMatchConfig, TripMatchEngine, TripRecord,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn london_trip() -> TripRecord {
    TripRecord {
        reference: "TRIP-LDN".to_string(),
        destinations: vec!["London".to_string()],
        start_date: Some(date(2025, 3, 15)),
        end_date: Some(date(2025, 3, 19)),
        pax: Some(2),
        budget: Some(Decimal::from(5000)),
        activities: vec!["museum tour".to_string()],
        ..TripRecord::default()
    }
}

fn package(id: &str, destinations: &[&str], base_cost: i64) -> Package {
    Package {
        id: id.to_string(),
        name: format!("{id} package"),
        code: None,
        destinations: destinations.iter().map(ToString::to_string).collect(),
        destination_nights: vec![],
        inclusions: vec!["Museum tour".to_string(), "Airport transfer".to_string()],
        valid_from: date(2025, 1, 1),
        valid_to: date(2025, 12, 31),
        base_cost: Decimal::from(base_cost),
        currency: "GBP".to_string(),
        min_group_size: 2,
        max_group_size: 20,
        duration_days: 5,
        duration_nights: 4,
        hotel_stars: Some(4),
        status: PackageStatus::Active,
    }
}

fn service(id: &str, name: &str, cost: i64, details: ServiceDetails) -> Service {
    Service {
        id: id.to_string(),
        name: name.to_string(),
        destination: "London".to_string(),
        cost: Decimal::from(cost),
        currency: "GBP".to_string(),
        details,
    }
}

fn activity(id: &str, name: &str, cost: i64) -> Service {
    service(
        id,
        name,
        cost,
        ServiceDetails::Activity {
            duration_minutes: Some(120),
            rating: None,
            activity_type: None,
        },
    )
}

fn meal(id: &str, cost: i64, meal_type: MealType) -> Service {
    service(
        id,
        &format!("{meal_type:?} at the pub"),
        cost,
        ServiceDetails::Meal {
            meal_type,
            cuisine: None,
            included_in_hotel: false,
        },
    )
}

fn london_services() -> Vec<Service> {
    vec![
        service(
            "H-LDN",
            "Covent Garden Hotel",
            120,
            ServiceDetails::Hotel {
                star_rating: Some(4),
                max_occupancy: 2,
                check_in: None,
                included_meals: vec![MealType::Breakfast],
            },
        ),
        service(
            "T-LHR",
            "Heathrow transfer",
            80,
            ServiceDetails::Transfer {
                vehicle_type: Some("sedan".to_string()),
                max_passengers: 4,
            },
        ),
        activity("A-MUS", "British Museum tour", 30),
        activity("A-EYE", "London Eye", 35),
        activity("A-THM", "Thames cruise", 60),
        meal("M-LUN", 25, MealType::Lunch),
        meal("M-DIN", 40, MealType::Dinner),
    ]
}

fn catalog(packages: Vec<Package>) -> Arc<InMemoryCatalog> {
    Arc::new(InMemoryCatalog::new(CatalogSeed {
        trips: vec![london_trip()],
        packages,
        services: london_services(),
    }))
}

fn engine(packages: Vec<Package>, advisory: Option<Arc<dyn AdvisoryProvider>>) -> TripMatchEngine {
    let catalog = catalog(packages);
    TripMatchEngine::new(
        &TripMatchConfig::default(),
        Collaborators {
            trips: catalog.clone(),
            packages: catalog.clone(),
            services: catalog,
            store: Arc::new(MemoryItineraryStore::new()),
            advisory,
        },
    )
}

fn engine_over(seed: CatalogSeed) -> TripMatchEngine {
    let catalog = Arc::new(InMemoryCatalog::new(seed));
    TripMatchEngine::new(
        &TripMatchConfig::default(),
        Collaborators {
            trips: catalog.clone(),
            packages: catalog.clone(),
            services: catalog,
            store: Arc::new(MemoryItineraryStore::new()),
            advisory: None,
        },
    )
}

const ANALYSIS_ONLY: MatchOptions = MatchOptions {
    build_itinerary: false,
    use_advisory: false,
};

/// Proposes the same itinerary name on every attempt
struct OneName;

impl NameGenerator for OneName {
    fn candidate(&self, trip_reference: &str, _sequence: u32) -> String {
        format!("{trip_reference}-ONLY")
    }
}

/// Returns every package whatever status is asked for
struct UnfilteredPackages(Vec<Package>);

#[async_trait]
impl PackageCatalog for UnfilteredPackages {
    async fn packages_by_status(&self, _status: PackageStatus) -> tripmatch::Result<Vec<Package>> {
        Ok(self.0.clone())
    }
}

/// Always returns the same assessment
struct StaticAdvisor(AdvisoryResult);

#[async_trait]
impl AdvisoryProvider for StaticAdvisor {
    async fn advise(
        &self,
        _requirement: &Requirement,
        _package: &Package,
        _candidates: &[Service],
    ) -> Result<AdvisoryResult, AdvisoryUnavailable> {
        Ok(self.0.clone())
    }
}

/// Never answers within any reasonable bound
struct SleepingAdvisor;

#[async_trait]
impl AdvisoryProvider for SleepingAdvisor {
    async fn advise(
        &self,
        _requirement: &Requirement,
        _package: &Package,
        _candidates: &[Service],
    ) -> Result<AdvisoryResult, AdvisoryUnavailable> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Err(AdvisoryUnavailable::transport("unreachable"))
    }
}

fn advice(selected: &[&str], recommendations: &[&str]) -> AdvisoryResult {
    AdvisoryResult {
        alignment_score: 90,
        strengths: vec!["Central location".to_string()],
        gaps: vec![],
        customization_recommendations: recommendations.iter().map(ToString::to_string).collect(),
        risk_factors: vec![],
        selected_services: Some(selected.iter().map(ToString::to_string).collect()),
    }
}

#[tokio::test]
async fn test_london_trip_matches_and_builds() {
    let engine = engine(vec![package("LDN-5", &["London"], 850)], None);
    let response = engine
        .match_and_build("TRIP-LDN", MatchOptions::default())
        .await;

    assert!(response.success, "{}", response.message);
    let breakdown = response.match_score_breakdown.unwrap();
    assert_eq!(breakdown.get("destination").unwrap().percentage, 100.0);
    assert_eq!(breakdown.get("group_size").unwrap().percentage, 100.0);
    assert!(response.match_score.unwrap() >= 80.0);
    assert!(!response.destination_mismatch_warning);

    let itinerary = response.itinerary.unwrap();
    assert_eq!(itinerary.id, "TRIP-LDN-ITN-001");
    assert_eq!(itinerary.day_plans.len(), 5);
    assert_eq!(itinerary.package_id, "LDN-5");
    assert_eq!(itinerary.currency, "GBP");
}

#[tokio::test]
async fn test_total_cost_equals_sum_of_assignments() {
    let engine = engine(vec![package("LDN-5", &["London"], 850)], None);
    let itinerary = engine
        .match_and_build("TRIP-LDN", MatchOptions::default())
        .await
        .itinerary
        .unwrap();

    let day_total: Decimal = itinerary.day_plans.iter().map(|d| d.cost()).sum();
    assert_eq!(itinerary.total_cost, day_total);
    assert_eq!(itinerary.total_cost, itinerary.assignments_total());
    assert!(itinerary.total_cost > Decimal::ZERO);

    // Breakfast is covered by the hotel, never billed separately
    let breakfasts = itinerary
        .day_plans
        .iter()
        .flat_map(|d| &d.assignments)
        .filter(|a| a.service.meal_type() == Some(MealType::Breakfast))
        .count();
    assert_eq!(breakfasts, 0);
}

#[tokio::test]
async fn test_no_active_packages() {
    let mut archived = package("OLD", &["London"], 850);
    archived.status = PackageStatus::Archived;
    let engine = engine(vec![archived], None);

    let response = engine
        .match_and_build("TRIP-LDN", MatchOptions::default())
        .await;
    assert!(!response.success);
    assert_eq!(response.message, "No active standard packages found");
    assert_eq!(response.error_kind, Some(ErrorKind::NoActivePackages));
}

#[tokio::test]
async fn test_everything_below_floor_reports_all_scores() {
    let mut hopeless = package("FAR", &["Tokyo"], 10_000);
    hopeless.valid_from = date(2020, 1, 1);
    hopeless.valid_to = date(2020, 12, 31);
    hopeless.min_group_size = 10;
    hopeless.inclusions = vec!["Sumo wrestling".to_string()];
    let engine = engine(vec![hopeless], None);

    let response = engine
        .match_and_build("TRIP-LDN", MatchOptions::default())
        .await;
    assert!(!response.success);
    assert_eq!(
        response.message,
        "No suitable package found for the trip requirements"
    );
    let scores = response.all_scores.unwrap();
    assert_eq!(scores.len(), 1);
    assert_eq!(scores[0].package_id, "FAR");
}

#[tokio::test]
async fn test_advisory_timeout_degrades_gracefully() {
    let engine = engine(
        vec![package("LDN-5", &["London"], 850)],
        Some(Arc::new(SleepingAdvisor)),
    )
    .with_advisory_timeout(Duration::from_millis(100));

    let response = engine
        .match_and_build("TRIP-LDN", MatchOptions::default())
        .await;

    assert!(response.success);
    assert!(response.advisory.is_none());
    assert!(response.ai_error.is_some());
    assert!(response.selected_package.is_some());
    assert!(response.match_score.is_some());
    let itinerary = response.itinerary.unwrap();
    assert_eq!(itinerary.advisory_notes.advisory_error, response.ai_error);
}

#[tokio::test]
async fn test_advisory_selection_and_recommendations_take_precedence() {
    let engine = engine(
        vec![package("LDN-5", &["London"], 850)],
        Some(Arc::new(StaticAdvisor(advice(
            &["A-THM"],
            &["Book the Thames cruise at sunset"],
        )))),
    );

    let response = engine
        .match_and_build("TRIP-LDN", MatchOptions::default())
        .await;
    assert!(response.success);
    assert_eq!(
        response.recommendations.first().map(String::as_str),
        Some("Book the Thames cruise at sunset")
    );

    let itinerary = response.itinerary.unwrap();
    let first_activity = itinerary.day_plans[0]
        .assignments
        .iter()
        .find(|a| a.service.category() == ServiceCategory::Activity)
        .map(|a| a.service.id.as_str());
    assert_eq!(first_activity, Some("A-THM"));
    assert_eq!(itinerary.advisory_notes.alignment_score, Some(90));
}

#[tokio::test]
async fn test_concurrent_builds_get_distinct_names() {
    let engine = Arc::new(engine(vec![package("LDN-5", &["London"], 850)], None));

    let (a, b) = tokio::join!(
        engine.match_and_build("TRIP-LDN", MatchOptions::default()),
        engine.match_and_build("TRIP-LDN", MatchOptions::default())
    );
    let (a, b) = (a.itinerary.unwrap(), b.itinerary.unwrap());
    assert_ne!(a.id, b.id);
    assert_eq!(engine.itineraries("TRIP-LDN").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_alternatives_ranked_behind_best() {
    let engine = engine(
        vec![
            package("LDN-5", &["London"], 850),
            package("PAR-4", &["Paris"], 700),
            package("LDN-PAR", &["London", "Paris"], 1200),
        ],
        None,
    );

    let response = engine
        .match_and_build(
            "TRIP-LDN",
            MatchOptions {
                build_itinerary: false,
                use_advisory: false,
            },
        )
        .await;
    assert_eq!(response.selected_package.unwrap().id, "LDN-5");
    let alternatives: Vec<&str> = response
        .alternative_packages
        .iter()
        .map(|a| a.package_id.as_str())
        .collect();
    assert_eq!(alternatives, vec!["LDN-PAR", "PAR-4"]);
    assert!(
        response.alternative_packages[1]
            .main_gaps
            .contains(&"destination: 0% match".to_string())
    );
}

#[rstest]
#[case(400, 100)]
#[case(500, 50)]
fn test_budget_score_flat_within_budget(#[case] cheaper: i64, #[case] cheapest: i64) {
    let mut trip = london_trip();
    trip.budget = Some(Decimal::from(1000));
    let requirement = Requirement::from_trip(&trip).unwrap();
    let scorer = PackageScorer::new(&ScoringConfig::default());

    let a = scorer.score(&requirement, &package("A", &["London"], cheaper));
    let b = scorer.score(&requirement, &package("B", &["London"], cheapest));
    assert_eq!(a.percentage("budget"), b.percentage("budget"));
    assert_eq!(a.percentage("budget"), Some(100.0));
}

#[test]
fn test_destination_score_monotonic_in_coverage() {
    let mut trip = london_trip();
    trip.destinations = vec![
        "London".to_string(),
        "Paris".to_string(),
        "Rome".to_string(),
    ];
    let requirement = Requirement::from_trip(&trip).unwrap();
    let scorer = PackageScorer::new(&ScoringConfig::default());

    let coverage = [
        vec![],
        vec!["London"],
        vec!["London", "Paris"],
        vec!["London", "Paris", "Rome"],
    ];
    let scores: Vec<f64> = coverage
        .iter()
        .map(|destinations| {
            let destinations = if destinations.is_empty() {
                vec!["Oslo"]
            } else {
                destinations.clone()
            };
            scorer
                .score(&requirement, &package("P", &destinations, 850))
                .total_score
        })
        .collect();

    assert!(scores.windows(2).all(|w| w[0] < w[1]), "{scores:?}");
    for score in scores {
        assert!((0.0..=100.0).contains(&score));
    }
}

#[tokio::test]
async fn test_missing_lodging_only_fails_build_mode() {
    let services = london_services()
        .into_iter()
        .filter(|s| s.category() != ServiceCategory::Hotel)
        .collect();
    let engine = engine_over(CatalogSeed {
        trips: vec![london_trip()],
        packages: vec![package("LDN-5", &["London"], 850)],
        services,
    });

    let analysis = engine.match_and_build("TRIP-LDN", ANALYSIS_ONLY).await;
    assert!(analysis.success, "{}", analysis.message);
    assert_eq!(analysis.selected_package.unwrap().id, "LDN-5");

    let build = engine
        .match_and_build("TRIP-LDN", MatchOptions::default())
        .await;
    assert!(!build.success);
    assert_eq!(build.error_kind, Some(ErrorKind::InsufficientInventory));
    assert!(build.itinerary.is_none());
    assert!(engine.itineraries("TRIP-LDN").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_naming_conflict_is_reported_not_raised() {
    let catalog = catalog(vec![package("LDN-5", &["London"], 850)]);
    let mut config = TripMatchConfig::default();
    config.writer.max_attempts = 2;
    let engine = TripMatchEngine::with_name_generator(
        &config,
        Collaborators {
            trips: catalog.clone(),
            packages: catalog.clone(),
            services: catalog,
            store: Arc::new(MemoryItineraryStore::new()),
            advisory: None,
        },
        Arc::new(OneName),
    );

    let first = engine
        .match_and_build("TRIP-LDN", MatchOptions::default())
        .await;
    assert_eq!(first.itinerary.unwrap().id, "TRIP-LDN-ONLY");

    let second = engine
        .match_and_build("TRIP-LDN", MatchOptions::default())
        .await;
    assert!(!second.success);
    assert_eq!(second.error_kind, Some(ErrorKind::PersistenceConflict));
    assert!(second.itinerary.is_none());
    assert_eq!(engine.itineraries("TRIP-LDN").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_star_preference_books_upgrade_and_flags_package() {
    let mut trip = london_trip();
    trip.preferred_hotel_star_rating = Some("5 Star".to_string());
    let mut services = london_services();
    services.push(service(
        "H-SAVOY",
        "The Savoy",
        400,
        ServiceDetails::Hotel {
            star_rating: Some(5),
            max_occupancy: 2,
            check_in: None,
            included_meals: vec![],
        },
    ));
    let engine = engine_over(CatalogSeed {
        trips: vec![trip],
        packages: vec![package("LDN-5", &["London"], 850)],
        services,
    });

    let response = engine
        .match_and_build("TRIP-LDN", MatchOptions::default())
        .await;
    assert!(response.success, "{}", response.message);
    assert!(
        response
            .recommendations
            .contains(&"Upgrade hotels to 5-star rating".to_string())
    );
    assert_eq!(
        response.requirement_gaps,
        vec!["Customer prefers 5-star hotels but package has 4-star".to_string()]
    );

    let itinerary = response.itinerary.unwrap();
    let hotels: Vec<&str> = itinerary
        .day_plans
        .iter()
        .flat_map(|d| &d.assignments)
        .filter(|a| a.service.category() == ServiceCategory::Hotel)
        .map(|a| a.service.id.as_str())
        .collect();
    assert_eq!(hotels, vec!["H-SAVOY"; 4]);

    // one room for two over four nights
    assert_eq!(
        itinerary.cost_breakdown.get(&ServiceCategory::Hotel),
        Some(&Decimal::from(1600))
    );
    let breakdown_total: Decimal = itinerary.cost_breakdown.values().copied().sum();
    assert_eq!(breakdown_total, itinerary.total_cost);
}

#[tokio::test]
async fn test_services_in_other_currencies_stay_out_of_the_total() {
    let mut services = london_services();
    let mut euro_tour = activity("A-EUR", "Museum tour", 1);
    euro_tour.currency = "EUR".to_string();
    services.push(euro_tour);
    let engine = engine_over(CatalogSeed {
        trips: vec![london_trip()],
        packages: vec![package("LDN-5", &["London"], 850)],
        services,
    });

    let itinerary = engine
        .match_and_build("TRIP-LDN", MatchOptions::default())
        .await
        .itinerary
        .unwrap();
    let assignments: Vec<_> = itinerary
        .day_plans
        .iter()
        .flat_map(|d| &d.assignments)
        .collect();
    assert!(assignments.iter().all(|a| a.service.currency == "GBP"));
    assert!(!assignments.iter().any(|a| a.service.id == "A-EUR"));
    assert!(
        itinerary
            .advisory_notes
            .deficiencies
            .iter()
            .any(|n| n.contains("priced in EUR skipped"))
    );
}

#[tokio::test]
async fn test_inactive_packages_from_catalog_are_ignored() {
    let catalog = catalog(vec![]);
    let mut archived = package("OLD", &["London"], 850);
    archived.status = PackageStatus::Archived;
    let engine = TripMatchEngine::new(
        &TripMatchConfig::default(),
        Collaborators {
            trips: catalog.clone(),
            packages: Arc::new(UnfilteredPackages(vec![archived])),
            services: catalog,
            store: Arc::new(MemoryItineraryStore::new()),
            advisory: None,
        },
    );

    let response = engine.match_and_build("TRIP-LDN", ANALYSIS_ONLY).await;
    assert!(!response.success);
    assert_eq!(response.error_kind, Some(ErrorKind::NoActivePackages));
}
