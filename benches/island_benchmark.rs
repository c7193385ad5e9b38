use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use tile_logistics::config::WorldConfig;
use tile_logistics::economy::PathCache;
use tile_logistics::map::editing::{place_building, remove_building};
use tile_logistics::map::{BuildingKind, IslandTracker, TileGrid, generate_world};

fn setup_world() -> (TileGrid, IslandTracker, PathCache) {
    let world = generate_world(&WorldConfig::default());
    (world.grid, world.islands, world.cache)
}

fn bench_full_sweep(c: &mut Criterion) {
    let (grid, _, _) = setup_world();

    c.bench_function("island_full_sweep", |b| {
        b.iter(|| IslandTracker::from_grid(&grid))
    });
}

/// Wall off and reopen a land tile with walkable neighbours on both sides
fn bench_incremental_edit(c: &mut Criterion) {
    let (grid, islands, cache) = setup_world();
    let Some(target) = grid.size().iter().find(|&pos| {
        grid.can_place(pos, BuildingKind::Wall).is_ok() && grid.neighbors(pos).count() == 4
    }) else {
        return;
    };

    c.bench_function("island_wall_then_remove", |b| {
        b.iter_batched(
            || (grid.clone(), islands.clone(), cache.clone()),
            |(mut grid, mut islands, mut cache)| {
                place_building(&mut grid, &mut islands, &mut cache, target, BuildingKind::Wall)
                    .ok();
                remove_building(&mut grid, &mut islands, &mut cache, target).ok();
                islands.island_count()
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_recompute_routes(c: &mut Criterion) {
    let (grid, islands, cache) = setup_world();

    c.bench_function("recompute_all_routes", |b| {
        b.iter_batched(
            || {
                let mut cache = cache.clone();
                cache.invalidate_all();
                cache
            },
            |mut cache| cache.recompute_stale(&grid, &islands),
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(
    benches,
    bench_full_sweep,
    bench_incremental_edit,
    bench_recompute_routes
);
criterion_main!(benches);
