//! Terminal output helpers.

use console::style;
use wayback::progress::NavigationState;
use wayback::route::Route;
use wayback::telemetry::TelemetrySnapshot;

/// Format meters as `850 m` or `1.2 km`.
pub fn format_distance(meters: f64) -> String {
    if meters >= 1000.0 {
        format!("{:.1} km", meters / 1000.0)
    } else {
        format!("{:.0} m", meters)
    }
}

/// Format seconds as `4 min` or `1 h 05 min`.
pub fn format_duration_secs(seconds: f64) -> String {
    let minutes = (seconds.max(0.0) / 60.0).round() as u64;
    if minutes >= 60 {
        format!("{} h {:02} min", minutes / 60, minutes % 60)
    } else {
        format!("{} min", minutes)
    }
}

/// Print a section header.
pub fn print_header(title: &str) {
    println!("{}", style(title).bold());
    println!("{}", "=".repeat(title.chars().count()));
    println!();
}

/// Print a newly adopted route.
pub fn print_route_adopted(route: &Route) {
    println!(
        "{} {} steps, {}, about {}",
        style("Route").cyan().bold(),
        route.step_count(),
        format_distance(route.total_distance_meters()),
        format_duration_secs(route.total_duration_seconds())
    );
}

/// Print all steps of a route.
pub fn print_route_steps(route: &Route) {
    for (index, step) in route.steps().iter().enumerate() {
        println!(
            "  {:>2}. {} {}",
            index + 1,
            step.instruction,
            style(format!("({})", format_distance(step.length_meters))).dim()
        );
    }
}

/// Print the step the user is now on.
pub fn print_step(state: &NavigationState, instruction: &str) {
    println!(
        "{} {} {}",
        style(format!("Step {}", state.current_step_index + 1)).green().bold(),
        instruction,
        style(format!(
            "in {}",
            format_distance(state.distance_to_next_step_meters)
        ))
        .dim()
    );
}

/// Print arrival.
pub fn print_arrived() {
    println!();
    println!("{}", style("You have arrived at your car.").green().bold());
}

/// Print a user-facing error message from the session.
pub fn print_session_error(message: &str) {
    println!("{} {}", style("Routing:").yellow().bold(), message);
}

/// Print final session summary.
pub fn print_session_summary(snapshot: &TelemetrySnapshot, state: &NavigationState) {
    println!();
    println!("Session Summary");
    println!("───────────────");
    println!("  Fixes processed: {}", snapshot.fixes_received);
    println!(
        "  Route requests:  {} ({} coalesced, {} failed, {} rejected)",
        snapshot.route_requests,
        snapshot.requests_coalesced,
        snapshot.routing_failures,
        snapshot.routes_rejected
    );
    println!("  Routes adopted:  {}", snapshot.routes_adopted);
    println!("  Step advances:   {}", snapshot.step_advances);
    println!(
        "  Final step:      {} ({})",
        state.current_step_index + 1,
        if state.has_arrived {
            "arrived"
        } else if state.is_navigating {
            "navigating"
        } else {
            "not navigating"
        }
    );
    println!("  Uptime: {}", snapshot.uptime_human());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(0.0), "0 m");
        assert_eq!(format_distance(849.6), "850 m");
        assert_eq!(format_distance(1234.0), "1.2 km");
    }

    #[test]
    fn test_format_duration_secs() {
        assert_eq!(format_duration_secs(0.0), "0 min");
        assert_eq!(format_duration_secs(250.0), "4 min");
        assert_eq!(format_duration_secs(3900.0), "1 h 05 min");
    }
}
