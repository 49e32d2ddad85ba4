//! Strata Runtime
//!
//! Small driver that fills an archetype with moving bodies and integrates
//! them for a fixed number of steps.
//!
//! Usage: `strata [settings.json]`

use anyhow::{Context, Result};
use glam::Vec2;
use std::sync::Mutex;
use strata_core::ecs::Archetype;
use strata_services::Settings;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Position(Vec2);

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Velocity(Vec2);

const DT: f32 = 1.0 / 60.0;

fn main() -> Result<()> {
    let settings = match std::env::args().nth(1) {
        Some(path) => Settings::load(&path)
            .with_context(|| format!("loading settings from {path}"))?,
        None => Settings::default(),
    };

    tracing_subscriber::fmt()
        .with_max_level(settings.logging.level()?)
        .init();

    tracing::info!("Strata v{}", strata_core::VERSION);

    let mut bodies = Archetype::<(Position, Velocity)>::new();
    spawn(&mut bodies, settings.demo.entities)?;
    tracing::info!(
        entities = bodies.entities_count(),
        chunks = bodies.component_at::<0>().chunk_count(),
        fingerprint = %bodies.fingerprint(),
        "spawned bodies"
    );

    for _ in 0..settings.demo.steps {
        integrate(&mut bodies, DT);
    }

    let (min, max) = bounds(&bodies);
    tracing::info!(
        steps = settings.demo.steps,
        min = ?min,
        max = ?max,
        "simulation finished"
    );

    Ok(())
}

/// Spread `count` bodies on a ring, each moving outward.
fn spawn(bodies: &mut Archetype<(Position, Velocity)>, count: usize) -> Result<()> {
    for i in 0..count {
        let angle = i as f32 / count.max(1) as f32 * std::f32::consts::TAU;
        let dir = Vec2::from_angle(angle);
        bodies.create_entity((Position(dir * 10.0), Velocity(dir * (1.0 + (i % 7) as f32))))?;
    }
    Ok(())
}

fn integrate(bodies: &mut Archetype<(Position, Velocity)>, dt: f32) {
    let velocities: Vec<Vec2> = bodies.component_at::<1>().iter().map(|v| v.0).collect();
    for (position, velocity) in bodies.component_at_mut::<0>().iter_mut().zip(velocities) {
        position.0 += velocity * dt;
    }
}

fn bounds(bodies: &Archetype<(Position, Velocity)>) -> (Vec2, Vec2) {
    let acc = Mutex::new((Vec2::splat(f32::MAX), Vec2::splat(f32::MIN)));
    bodies
        .component_at::<0>()
        .par_for_each_chunk(|_, chunk| {
            let (lo, hi) = chunk.iter().fold(
                (Vec2::splat(f32::MAX), Vec2::splat(f32::MIN)),
                |(lo, hi), p| (lo.min(p.0), hi.max(p.0)),
            );
            let mut acc = acc.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            acc.0 = acc.0.min(lo);
            acc.1 = acc.1.max(hi);
        });
    acc.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integration_moves_every_body_by_its_velocity() {
        let mut bodies = Archetype::<(Position, Velocity)>::new();
        spawn(&mut bodies, 100).unwrap();
        let before: Vec<Vec2> = bodies.component_at::<0>().iter().map(|p| p.0).collect();

        integrate(&mut bodies, 0.5);

        let store = bodies.component_at::<0>();
        for (row, start) in before.into_iter().enumerate() {
            let expected = start + bodies.component_at::<1>()[row].0 * 0.5;
            assert!((store[row].0 - expected).length() < 1e-5);
        }
    }

    #[test]
    fn bounds_cover_all_bodies() {
        let mut bodies = Archetype::<(Position, Velocity)>::new();
        spawn(&mut bodies, 200).unwrap();
        let (min, max) = bounds(&bodies);
        for p in bodies.component_at::<0>().iter() {
            assert!(p.0.cmpge(min).all() && p.0.cmple(max).all());
        }
        assert!((max.x - 10.0).abs() < 1e-4);
    }
}
