//! Sprite swarm demo
//!
//! Runs a fixed number of frames against the headless device: sprites spawn at
//! random, drift and spin, expire, and get replaced, so the pool grows and
//! recycles slots the way a game would drive it.

use rand::prelude::*;
use sprite_engine::foundation::logging;
use sprite_engine::foundation::math::constants::PI;
use sprite_engine::prelude::*;
use sprite_engine::render::scene::DEFAULT_PASS_DEPTH;
use std::time::Duration;

const CONFIG_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/config/engine.ron");
const FRAMES: u64 = 600;
const FRAME_STEP: Duration = Duration::from_micros(16_667);
const SPAWN_PER_FRAME: usize = 3;
const MAX_SPRITES: usize = 150;
const WORLD_HALF_EXTENT: f32 = 20.0;

struct Drifter {
    sprite: Sprite,
    velocity: Vec2,
    spin: f32,
    remaining: f32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| CONFIG_PATH.to_string());
    let config = EngineConfig::load_or_default(&config_path)?;
    let atlas = SpriteAtlas::from_config(&config.atlas)?;
    let mut frame_names: Vec<String> = atlas.names().map(str::to_string).collect();
    frame_names.sort();

    let mut device = HeadlessDevice::new();
    let program = device.register_sprite_program();
    let texture = device.create_texture();
    let mut scene = Scene::new(&mut device);
    scene.set_view(Mat3::scaling_2d(1.0 / WORLD_HALF_EXTENT, 1.0 / WORLD_HALF_EXTENT));
    let pass = SpritePass::from_config(&mut device, program, texture, scene.quad_buffer(), &config);
    scene.add_pass(Box::new(pass), DEFAULT_PASS_DEPTH);

    let mut rng = rand::thread_rng();
    let mut clock = FrameClock::new();
    let mut drifters: Vec<Drifter> = Vec::new();

    log::info!("Running {} frames with up to {} sprites", FRAMES, MAX_SPRITES);

    for _ in 0..FRAMES {
        let dt = clock.tick_fixed(FRAME_STEP);
        let pass = scene.pass_mut::<SpritePass>().ok_or("sprite pass missing from scene")?;

        // Expire
        let mut index = 0;
        while index < drifters.len() {
            drifters[index].remaining -= dt;
            if drifters[index].remaining <= 0.0 {
                let expired = drifters.swap_remove(index);
                expired.sprite.destroy(pass)?;
            } else {
                index += 1;
            }
        }

        // Spawn
        for _ in 0..SPAWN_PER_FRAME {
            if drifters.len() >= MAX_SPRITES {
                break;
            }
            let frame = frame_names.choose(&mut rng).and_then(|name| atlas.get(name));
            let mut sprite = Sprite::new(pass, &mut device, frame)?;
            sprite.position = Vec2::new(
                rng.gen_range(-WORLD_HALF_EXTENT..WORLD_HALF_EXTENT),
                rng.gen_range(-WORLD_HALF_EXTENT..WORLD_HALF_EXTENT),
            );
            sprite.angle = rng.gen_range(0.0..2.0 * PI);
            sprite.scale = rng.gen_range(0.5..1.5);
            sprite.mirror = rng.gen_bool(0.5);
            drifters.push(Drifter {
                sprite,
                velocity: Vec2::new(rng.gen_range(-4.0..4.0), rng.gen_range(-4.0..4.0)),
                spin: rng.gen_range(-PI..PI),
                remaining: rng.gen_range(0.5..4.0),
            });
        }

        // Move
        for drifter in &mut drifters {
            drifter.sprite.position += drifter.velocity * dt;
            drifter.sprite.angle += drifter.spin * dt;
            drifter.sprite.update(pass)?;
        }

        // Render
        scene.update(dt);
        scene.prepare(&mut device);
        scene.draw(&mut device);

        if clock.frame_count() % 60 == 0 {
            let pool = scene.pass::<SpritePass>().ok_or("sprite pass missing from scene")?.pool();
            log::info!(
                "t={:.1}s live={} head={} capacity={} free={} uploads={}",
                clock.total_time(),
                pool.live_count(),
                pool.head(),
                pool.capacity(),
                pool.free_slots().len(),
                device.stats().subrange_uploads
            );
        }
    }

    let stats = scene
        .pass::<SpritePass>()
        .ok_or("sprite pass missing from scene")?
        .pool()
        .stats()
        .clone();
    log::info!(
        "Done after {:.1}s ({:.0} fps): {} acquired, {} released, {} recycled, \
         {} growth(s), peak {} live, {} draws",
        clock.total_time(),
        clock.average_fps(),
        stats.acquired,
        stats.released,
        stats.recycled,
        stats.growths,
        stats.peak_live,
        device.draws().len()
    );

    scene.destroy(&mut device);
    if device.live_buffer_count() != 0 {
        log::warn!("{} device buffer(s) leaked", device.live_buffer_count());
    }
    Ok(())
}
