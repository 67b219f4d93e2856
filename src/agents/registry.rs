use std::error::Error;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::agent::Agent;
use crate::agents::min::MinAgent;
use crate::agents::random::RandomAgent;

/// Returns a normalized label for an agent spec (the head token before any ':').
pub fn label_for_spec(spec: &str) -> String {
    spec.split(':')
        .next()
        .unwrap_or(spec)
        .trim()
        .to_ascii_lowercase()
}

/// Create an agent instance from a CLI-style spec.
/// Supported specs:
/// - random[:seed]
/// - min
/// - min:nowild
pub fn create_agent_from_spec(
    spec: &str,
    index: usize,
    seed: u64,
) -> Result<Box<dyn Agent>, Box<dyn Error>> {
    let spec_lower = spec.to_ascii_lowercase();
    if spec_lower.starts_with("random") {
        let custom_seed = spec
            .split_once(':')
            .and_then(|(_, value)| value.parse::<u64>().ok())
            .unwrap_or(seed ^ ((index as u64 + 1) * 0x9E37_79B9));
        Ok(Box::new(RandomAgent::new(StdRng::seed_from_u64(custom_seed))))
    } else if spec_lower.starts_with("min") {
        let agent = match spec_lower.split_once(':') {
            Some((_, "nowild")) => MinAgent::without_wildcard_plays(),
            _ => MinAgent::new(),
        };
        Ok(Box::new(agent))
    } else {
        Err(format!("unrecognized agent spec: {spec}").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_strip_arguments() {
        assert_eq!(label_for_spec("random:42"), "random");
        assert_eq!(label_for_spec("Min:nowild"), "min");
    }

    #[test]
    fn unknown_specs_are_rejected() {
        assert!(create_agent_from_spec("alphazero", 0, 1).is_err());
        assert!(create_agent_from_spec("random:7", 0, 1).is_ok());
        assert!(create_agent_from_spec("min:nowild", 1, 1).is_ok());
    }
}
