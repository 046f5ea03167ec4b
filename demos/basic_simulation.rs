//! Basic physics simulation example
//!
//! A ball and a tumbling box fall onto a floor under gravity. Run with
//! `RUST_LOG=rigidcore=debug` to see the per-step pipeline summary.

use rigidcore::prelude::*;

fn main() -> Result<(), PhysicsError> {
    env_logger::init();

    println!("rigidcore - Basic Simulation Example");
    println!("====================================\n");

    let mut world = World::new(WorldConfig::default())?;

    world.add_body(RigidBodyDesc::fixed(Shape::cuboid(Vec3::new(10.0, 0.5, 10.0))))?;
    println!("Created floor at Y=0 (top surface at Y=0.5)");

    let ball = world.add_body(
        RigidBodyDesc::dynamic(Shape::sphere(0.5))
            .with_position(Vec3::new(0.0, 5.0, 0.0))
            .with_mass(1.0)
            .with_material(Material::new(1000.0, 0.6, 0.4)),
    )?;
    println!("Created ball at Y=5.0 (radius=0.5, restitution=0.6)");

    let crate_box = world.add_body(
        RigidBodyDesc::dynamic(Shape::cuboid(Vec3::splat(0.4)))
            .with_position(Vec3::new(2.0, 3.0, 0.0))
            .with_rotation(Quat::from_rotation_z(0.4))
            .with_angular_velocity(Vec3::new(0.0, 0.0, 2.0)),
    )?;
    println!("Created box at (2, 3, 0) spinning about Z\n");

    let dt = 1.0 / 60.0;
    let total_time = 3.0;
    let steps = (total_time / dt) as usize;

    println!("Simulating {} seconds ({} steps at {}Hz)...\n", total_time, steps, 1.0 / dt);

    for i in 0..steps {
        let report = world.step(dt)?;

        // Print every 30 frames (0.5 seconds)
        if i % 30 == 0 {
            let pos = world.pose(ball)?.position;
            let vel = world.body(ball).map(|b| b.linear_velocity).unwrap_or(Vec3::ZERO);
            println!(
                "t={:.2}s: ball=({:.3}, {:.3}, {:.3}) v=({:.3}, {:.3}, {:.3}) contacts={}",
                i as f32 * dt,
                pos.x,
                pos.y,
                pos.z,
                vel.x,
                vel.y,
                vel.z,
                report.manifolds
            );
        }
    }

    let ball_pos = world.pose(ball)?.position;
    let box_pos = world.pose(crate_box)?.position;
    println!("\nFinal ball position: ({:.3}, {:.3}, {:.3})", ball_pos.x, ball_pos.y, ball_pos.z);
    println!("Final box position:  ({:.3}, {:.3}, {:.3})", box_pos.x, box_pos.y, box_pos.z);
    println!("Expected ball rest: ~(0, 1.0, 0) (floor top at 0.5 + ball radius 0.5)");

    if let Some(hit) = world.raycast(Vec3::new(0.0, 10.0, 0.0), -Vec3::Y, 20.0) {
        println!(
            "Ray from (0, 10, 0) straight down hits {:?} at distance {:.3}",
            hit.body, hit.distance
        );
    }

    Ok(())
}
