//! Prompt construction for the advisory service

use std::fmt::Write;

use crate::models::{Package, Requirement, Service};

/// Candidate services listed in the prompt
const MAX_CANDIDATES: usize = 60;

pub const SYSTEM_PROMPT: &str = "You are a senior travel consultant reviewing how well a \
pre-built package fits a customer's trip request. Return ONLY one valid JSON object.";

#[must_use]
pub fn build_user_prompt(requirement: &Requirement, package: &Package, candidates: &[Service]) -> String {
    let mut prompt = String::new();

    prompt.push_str("Customer requirement:\n");
    let _ = writeln!(prompt, "- destinations: {}", requirement.destinations.join(", "));
    match (requirement.start_date, requirement.end_date) {
        (Some(start), Some(end)) => {
            let _ = writeln!(prompt, "- dates: {start} to {end}");
        }
        _ => prompt.push_str("- dates: not fixed\n"),
    }
    let _ = writeln!(prompt, "- date flexibility: {:?}", requirement.date_flexibility);
    let _ = writeln!(prompt, "- travellers: {}", requirement.passenger_count);
    match requirement.budget {
        Some(budget) => {
            let _ = writeln!(prompt, "- budget: {budget}");
        }
        None => prompt.push_str("- budget: not specified\n"),
    }
    if !requirement.desired_activities.is_empty() {
        let activities: Vec<&str> = requirement
            .desired_activities
            .iter()
            .map(String::as_str)
            .collect();
        let _ = writeln!(prompt, "- activities: {}", activities.join(", "));
    }
    if let Some(stars) = requirement.preferred_hotel_stars {
        let _ = writeln!(prompt, "- preferred hotel: {stars} star");
    }
    let _ = writeln!(prompt, "- priority: {:?}", requirement.priority);

    prompt.push_str("\nSelected package:\n");
    let _ = writeln!(prompt, "- name: {} ({})", package.name, package.id);
    let _ = writeln!(prompt, "- destinations: {}", package.destinations.join(", "));
    if !package.destination_nights.is_empty() {
        let stays: Vec<String> = package
            .destination_nights
            .iter()
            .map(|s| format!("{} x{}", s.destination, s.nights))
            .collect();
        let _ = writeln!(prompt, "- nights: {}", stays.join(", "));
    }
    let _ = writeln!(
        prompt,
        "- duration: {} days / {} nights",
        package.duration_days, package.duration_nights
    );
    let _ = writeln!(
        prompt,
        "- price: {} {} per person",
        package.base_cost, package.currency
    );
    let _ = writeln!(
        prompt,
        "- valid: {} to {}",
        package.valid_from, package.valid_to
    );
    if !package.inclusions.is_empty() {
        let _ = writeln!(prompt, "- inclusions: {}", package.inclusions.join("; "));
    }

    if !candidates.is_empty() {
        prompt.push_str("\nBookable services (id | category | destination | name | unit price):\n");
        for service in candidates.iter().take(MAX_CANDIDATES) {
            let _ = writeln!(
                prompt,
                "- {} | {} | {} | {} | {} {}",
                service.id,
                service.category(),
                service.destination,
                service.name,
                service.cost,
                service.currency
            );
        }
    }

    prompt.push_str("\nReturn a JSON object with shape:\n");
    prompt.push_str(
        r#"{"alignment_score":0,"strengths":["..."],"gaps":["..."],"customization_recommendations":["..."],"risk_factors":["..."]"#,
    );
    if candidates.is_empty() {
        prompt.push('}');
    } else {
        prompt.push_str(r#","selected_services":["service id"]}"#);
        prompt.push_str("\nOnly select ids from the bookable services list.");
    }
    prompt.push_str("\nalignment_score is an integer from 0 to 100. Return JSON only.\n");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DateFlexibility, PackageStatus, Priority, ServiceDetails};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::collections::BTreeSet;

    fn requirement() -> Requirement {
        Requirement {
            trip_reference: "TRIP-1".to_string(),
            destinations: vec!["London".to_string()],
            start_date: NaiveDate::from_ymd_opt(2025, 3, 15),
            end_date: NaiveDate::from_ymd_opt(2025, 3, 19),
            date_flexibility: DateFlexibility::Week,
            budget: None,
            passenger_count: 2,
            desired_activities: BTreeSet::from(["museum tour".to_string()]),
            priority: Priority::High,
            preferred_hotel_stars: Some(4),
        }
    }

    fn package() -> Package {
        Package {
            id: "PKG-LON".to_string(),
            name: "London Highlights".to_string(),
            code: None,
            destinations: vec!["London".to_string()],
            destination_nights: vec![],
            inclusions: vec!["Museum tour".to_string()],
            valid_from: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            valid_to: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
            base_cost: Decimal::from(850),
            currency: "GBP".to_string(),
            min_group_size: 2,
            max_group_size: 20,
            duration_days: 5,
            duration_nights: 4,
            hotel_stars: Some(4),
            status: PackageStatus::Active,
        }
    }

    #[test]
    fn test_prompt_summarizes_requirement_and_package() {
        let prompt = build_user_prompt(&requirement(), &package(), &[]);
        assert!(prompt.contains("- destinations: London"));
        assert!(prompt.contains("- budget: not specified"));
        assert!(prompt.contains("London Highlights (PKG-LON)"));
        assert!(!prompt.contains("selected_services"));
    }

    #[test]
    fn test_prompt_lists_candidates() {
        let hotel = Service {
            id: "H-STRAND".to_string(),
            name: "Strand Hotel".to_string(),
            destination: "London".to_string(),
            cost: Decimal::from(180),
            currency: "GBP".to_string(),
            details: ServiceDetails::Hotel {
                star_rating: Some(4),
                max_occupancy: 2,
                check_in: None,
                included_meals: vec![],
            },
        };
        let prompt = build_user_prompt(&requirement(), &package(), &[hotel]);
        assert!(prompt.contains("H-STRAND | hotel | London | Strand Hotel"));
        assert!(prompt.contains("selected_services"));
    }
}
