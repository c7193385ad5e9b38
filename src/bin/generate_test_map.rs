//! Headless world generation; prints the map as ASCII.
//! Run with: cargo run --bin generate_test_map -- [seed] [chunks]

use bevy::log::LogPlugin;
use bevy::prelude::*;
use tile_logistics::LogicPlugins;
use tile_logistics::config::WorldConfig;
use tile_logistics::map::{IslandTracker, TileGrid};

fn main() {
    let mut args = std::env::args().skip(1);
    let mut config = WorldConfig::default();
    if let Some(seed) = args.next().and_then(|s| s.parse().ok()) {
        config.seed = seed;
    }
    if let Some(chunks) = args.next().and_then(|s| s.parse().ok()) {
        config.chunks_x = chunks;
        config.chunks_y = chunks;
    }
    if let Err(err) = config.validate() {
        eprintln!("Invalid configuration: {err}");
        std::process::exit(1);
    }

    let mut app = App::new();
    app.add_plugins((MinimalPlugins, LogPlugin::default()))
        .insert_resource(config)
        .add_plugins(LogicPlugins);

    // Startup generates the world; one update is enough
    app.update();

    let world = app.world();
    let grid = world.resource::<TileGrid>();
    let islands = world.resource::<IslandTracker>();
    println!("{}", grid.render_ascii());
    println!(
        "{}x{} tiles, {} islands, {} resource nodes, {} markets, home base {:?}",
        grid.size().x,
        grid.size().y,
        islands.island_count(),
        grid.resource_nodes().count(),
        grid.markets().count(),
        grid.home_base()
    );
}
