use gosling::config::GoslingConfiguration;
use gosling::prelude::*;
use gumdrop::Options;

fn main() {
    let result = GoslingAttack::initialize().and_then(|gosling_attack| gosling_attack.execute());
    match result {
        Ok(metrics) => {
            if metrics.outcome == RunOutcome::Interrupted {
                eprintln!("Tests interrupted.");
                std::process::exit(1);
            }
        }
        Err(e @ GoslingError::InvalidOption { .. }) | Err(e @ GoslingError::InvalidHost { .. }) => {
            eprintln!("{}\n", e);
            eprintln!("Usage: gosling [OPTIONS] URL (-n REQUESTS | -d TIME)\n");
            eprintln!("{}", GoslingConfiguration::usage());
            std::process::exit(2);
        }
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}
