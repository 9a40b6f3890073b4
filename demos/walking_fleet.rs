//! A few simulated users walking around San Francisco.
//!
//! Start the hub first (`cargo run --bin survale-hub`), then run this demo.
//! Each walker has its own sync loop and hub connection; the first walker
//! prints what its map would show after every step.
//!
//! Run with: cargo run --example walking_fleet

use std::sync::Arc;
use std::time::Duration;

use survale_sync::{
    Authorization, Config, HubStore, LocationSync, Position, Region, SharedSession,
    SimulatedLocator,
};

const WALKERS: [&str; 3] = ["alice", "bob", "carol"];
const STEPS: usize = 20;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter("warn").init();

    let config = Config::load();
    println!("=== Walking fleet against {} ===\n", config.hub_url);

    let mut fleet = Vec::new();
    for name in WALKERS {
        let store = match HubStore::connect(&config.hub_url).await {
            Ok(store) => store,
            Err(e) => {
                eprintln!("Could not reach the hub: {e}");
                eprintln!("Start it with: cargo run --bin survale-hub");
                return;
            }
        };

        let locator = Arc::new(SimulatedLocator::new(Authorization::AuthorizedWhenInUse));
        let sync = LocationSync::new(
            locator,
            Arc::new(store),
            Arc::new(SharedSession::signed_in(name)),
        );
        sync.start();
        sync.subscribe_to_remote_positions();
        fleet.push((name, sync));
    }

    let home = Region::default();
    for step in 0..STEPS {
        for (i, (_, sync)) in fleet.iter().enumerate() {
            let angle = (step as f64 / STEPS as f64 + i as f64 / WALKERS.len() as f64)
                * std::f64::consts::TAU;
            let radius = 0.01 * (i + 1) as f64;
            sync.handle().on_position_update(Position::new(
                home.center_latitude + radius * angle.sin(),
                home.center_longitude + radius * angle.cos(),
            ));
        }

        tokio::time::sleep(Duration::from_millis(250)).await;

        let (name, observer) = &fleet[0];
        let state = observer.state();
        println!("Step {step:2}: {name} sees {} other user(s)", state.other_users().len());
        for (user, position) in state.other_users() {
            println!(
                "    {user:<6} ({:.4}, {:.4})",
                position.latitude, position.longitude
            );
        }
        if let Some(bounds) = state.positions.bounds() {
            println!(
                "    fit camera: center ({:.4}, {:.4}) span {:.4} x {:.4}",
                bounds.center_latitude,
                bounds.center_longitude,
                bounds.latitude_delta,
                bounds.longitude_delta
            );
        }
    }

    println!("\nDone.");
}
