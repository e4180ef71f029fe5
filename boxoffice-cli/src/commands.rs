use crate::error::AppError;
use boxoffice_order::ReservationService;
use boxoffice_shared::{HoldId, LevelId};
use serde_json::{json, Value};
use std::str::FromStr;

pub const HELP: &str = "commands: available [level] | hold <n> <email> [min] [max] | reserve <hold_id> <email> | levels | help | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Available(Option<LevelId>),
    Hold {
        num_seats: usize,
        customer_id: String,
        min_level: Option<LevelId>,
        max_level: Option<LevelId>,
    },
    Reserve {
        hold_id: HoldId,
        customer_id: String,
    },
    Levels,
    Help,
    Quit,
}

fn parse_arg<T: FromStr>(value: &str, name: &str) -> Result<T, AppError> {
    value
        .parse()
        .map_err(|_| AppError::usage(format!("invalid {}: {}", name, value)))
}

fn parse_optional<T: FromStr>(value: Option<&str>, name: &str) -> Result<Option<T>, AppError> {
    value.map(|v| parse_arg(v, name)).transpose()
}

impl FromStr for Command {
    type Err = AppError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some((&verb, args)) = parts.split_first() else {
            return Err(AppError::usage(HELP));
        };

        match (verb.to_lowercase().as_str(), args) {
            ("available", [level @ ..]) if level.len() <= 1 => {
                Ok(Command::Available(parse_optional(level.first().copied(), "level")?))
            }
            ("hold", [count, email, bounds @ ..]) if bounds.len() <= 2 => {
                // Non-positive counts reach the service, which turns them away
                let requested: i64 = parse_arg(count, "seat count")?;
                Ok(Command::Hold {
                    num_seats: usize::try_from(requested).unwrap_or(0),
                    customer_id: email.to_string(),
                    min_level: parse_optional(bounds.first().copied(), "min level")?,
                    max_level: parse_optional(bounds.get(1).copied(), "max level")?,
                })
            }
            ("reserve", [hold_id, email]) => Ok(Command::Reserve {
                hold_id: parse_arg(hold_id, "hold id")?,
                customer_id: email.to_string(),
            }),
            ("levels", []) => Ok(Command::Levels),
            ("help", _) => Ok(Command::Help),
            ("quit" | "exit", []) => Ok(Command::Quit),
            _ => Err(AppError::usage(HELP)),
        }
    }
}

/// Runs one command against the service and renders the JSON response
pub fn execute(service: &ReservationService, command: Command) -> Result<Value, AppError> {
    match command {
        Command::Available(level) => {
            let available = service.num_seats_available(level)?;
            Ok(json!({ "level": level, "available": available }))
        }
        Command::Hold { num_seats, customer_id, min_level, max_level } => {
            let outcome = service.find_and_hold_seats(num_seats, min_level, max_level, &customer_id);
            Ok(serde_json::to_value(outcome)?)
        }
        Command::Reserve { hold_id, customer_id } => {
            let reservation_id = service.reserve_seats(hold_id, &customer_id)?;
            Ok(json!({ "hold_id": hold_id, "reservation_id": reservation_id }))
        }
        Command::Levels => {
            let levels = service.catalog().levels();
            let tallies = service.level_tallies();
            let rows: Vec<Value> = levels
                .iter()
                .zip(tallies)
                .map(|(level, tally)| {
                    json!({
                        "id": level.id,
                        "name": level.name,
                        "price": level.price,
                        "capacity": tally.capacity,
                        "free": tally.free,
                        "held": tally.held,
                        "reserved": tally.reserved,
                    })
                })
                .collect();
            Ok(Value::Array(rows))
        }
        Command::Help => Ok(json!({ "help": HELP })),
        Command::Quit => Ok(json!({ "bye": true })),
    }
}

/// Parses and runs one input line; errors come back as JSON too
pub fn handle_line(service: &ReservationService, line: &str) -> (Value, bool) {
    match line.parse::<Command>() {
        Ok(Command::Quit) => (json!({ "bye": true }), true),
        Ok(command) => match execute(service, command) {
            Ok(response) => (response, false),
            Err(err) => (err.into_response(), false),
        },
        Err(err) => (err.into_response(), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxoffice_catalog::VenueCatalog;
    use boxoffice_core::app_config::HoldSettings;
    use boxoffice_core::ManualClock;
    use std::sync::Arc;

    fn service() -> ReservationService {
        ReservationService::new(VenueCatalog::default(), HoldSettings::default(), Arc::new(ManualClock::default()))
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!("available".parse::<Command>().unwrap(), Command::Available(None));
        assert_eq!("AVAILABLE 3".parse::<Command>().unwrap(), Command::Available(Some(3)));
        assert_eq!(
            "hold 4 fan@example.com 2".parse::<Command>().unwrap(),
            Command::Hold {
                num_seats: 4,
                customer_id: "fan@example.com".to_string(),
                min_level: Some(2),
                max_level: None,
            }
        );
        assert_eq!(
            "reserve 9 fan@example.com".parse::<Command>().unwrap(),
            Command::Reserve { hold_id: 9, customer_id: "fan@example.com".to_string() }
        );
        assert_eq!("quit".parse::<Command>().unwrap(), Command::Quit);
    }

    #[test]
    fn test_negative_seat_count_is_passed_as_zero() {
        let command = "hold -3 fan@example.com".parse::<Command>().unwrap();
        assert!(matches!(command, Command::Hold { num_seats: 0, .. }));
    }

    #[test]
    fn test_malformed_input_is_usage_error() {
        for line in ["", "hold", "hold x fan@example.com", "reserve abc fan@example.com", "available 1 2", "dance"] {
            assert!(matches!(line.parse::<Command>(), Err(AppError::Usage(_))), "{:?}", line);
        }
    }

    #[test]
    fn test_hold_and_reserve_round_trip() {
        let service = service();

        let (held, done) = handle_line(&service, "hold 10 fan@example.com");
        assert!(!done);
        assert_eq!(held["status"], "HELD");
        assert_eq!(held["level_id"], 1);
        let hold_id = held["id"].as_u64().unwrap();

        let (reserved, _) = handle_line(&service, &format!("reserve {} FAN@example.com", hold_id));
        assert!(reserved["reservation_id"].as_str().is_some());

        let (available, _) = handle_line(&service, "available");
        assert_eq!(available["available"], 6240);
    }

    #[test]
    fn test_errors_are_rendered_as_json() {
        let service = service();

        let (response, _) = handle_line(&service, "available 7");
        assert_eq!(response["error"], "INVALID_LEVEL");

        let (response, _) = handle_line(&service, "reserve 1234 fan@example.com");
        assert_eq!(response["error"], "HOLD_NOT_FOUND");

        let (response, _) = handle_line(&service, "hold 0 fan@example.com");
        assert_eq!(response["status"], "REJECTED");
        assert_eq!(response["reason"], "INVALID_SEAT_COUNT");

        let (response, done) = handle_line(&service, "exit");
        assert!(done);
        assert_eq!(response["bye"], true);
    }

    #[test]
    fn test_levels_lists_tallies() {
        let service = service();
        handle_line(&service, "hold 20 fan@example.com 2");

        let (response, _) = handle_line(&service, "levels");
        let levels = response.as_array().unwrap();
        assert_eq!(levels.len(), 4);
        assert_eq!(levels[1]["name"], "Main");
        assert_eq!(levels[1]["held"], 20);
        assert_eq!(levels[1]["free"], 1980);
    }
}
