//! Modifier broadcast example: data-driven network, wind turbines, and the
//! Ready barrier.
//!
//! Loads `data/network.ron`, broadcasts an upgrade to the wind turbines and
//! drives them tick by tick with a varying wind multiplier. The Ready
//! subscriber only reads the total once every turbine has reported.
//!
//! Run with: `RUST_LOG=info cargo run -p gridwork-examples --example modifier_broadcast`

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use gridwork_core::event::{Event, EventKind, SubscriberPriority};
use gridwork_core::fixed::Fixed64;
use gridwork_core::id::ModifierId;
use gridwork_data::{DataLoadError, load_network};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), DataLoadError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("data");
    let mut loaded = load_network(&dir)?;
    println!(
        "loaded {} nodes, {} modifiers; total production {}",
        loaded.nodes.len(),
        loaded.modifiers.len(),
        loaded.network.total_production()
    );

    let settled_totals: Rc<RefCell<Vec<Fixed64>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = settled_totals.clone();
    // Only upgrades count; the closing reset broadcast is filtered out.
    loaded.network.subscribe_filtered(
        EventKind::BroadcastReady,
        SubscriberPriority::Post,
        Some(Box::new(|event| {
            !matches!(
                event,
                Event::BroadcastReady { modifier, .. } if *modifier == ModifierId::NEUTRAL
            )
        })),
        Box::new(move |event| {
            if let Event::BroadcastReady {
                generation,
                total_production,
                ..
            } = event
            {
                println!("  READY {generation}: total production {total_production}");
                sink.borrow_mut().push(*total_production);
            }
        }),
    );

    let turbines = loaded.network.dynamic_nodes();
    let wind = [0.4, 0.9, 1.2, 0.7];

    // Give the turbines a first wind sample before any upgrade.
    for id in &turbines {
        loaded.network.update_dynamic(*id, Fixed64::from_num(wind[0]));
    }
    println!("baseline total: {}", loaded.network.total_production());

    let Some(blades) = loaded.modifiers.get("turbine_blades").cloned() else {
        println!("no turbine_blades modifier in the catalog");
        return Ok(());
    };

    println!("--- Broadcast turbine_blades ---");
    let ticket = loaded.network.broadcast_modifier(blades);
    info!(generation = %ticket.generation, pending = ticket.pending, "waiting on turbines");

    // Each tick only some turbines update; Ready fires on the last report.
    for (tick, sample) in wind.iter().enumerate().skip(1) {
        let env = Fixed64::from_num(*sample);
        for (i, id) in turbines.iter().enumerate() {
            if i < tick
                && let Some(outcome) = loaded.network.update_dynamic(*id, env)
            {
                println!("  tick {tick}: turbine {i} reported -> {outcome:?}");
            }
        }
        println!(
            "tick {tick}: barrier {:?}, total {}",
            loaded.network.barrier().state(),
            loaded.network.total_production()
        );
    }

    println!("--- Clear all modifiers ---");
    loaded.network.broadcast_clear();
    for id in &turbines {
        loaded.network.update_dynamic(*id, Fixed64::from_num(1.0));
    }

    println!("settled totals: {:?}", settled_totals.borrow());
    Ok(())
}
