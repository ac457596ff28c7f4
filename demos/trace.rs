//! Plans a blended right-angle corner and prints the sampled trajectory as
//! CSV, one row per millisecond: time, position, velocity magnitude.
//!
//! Pipe the output into a plotting tool to inspect the blend.

use env_logger::Env;
use scurve_tp::{Coord3, CornerBlendMethod, CornerBlendType, Move, Planner};

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let mut planner = Planner::new();
    planner.set_position_limits(-100.0, -100.0, -100.0, 100.0, 100.0, 100.0);
    planner.set_velocity_limits(20.0, 20.0, 20.0);
    planner.set_acceleration_limits(500.0, 500.0, 500.0);
    planner.set_jerk_limits(5000.0, 5000.0, 5000.0);
    planner.set_corner_blend_method(CornerBlendMethod::ConstantJerkSegments);

    for dst in [
        Coord3::new(10.0, 0.0, 0.0),
        Coord3::new(10.0, 10.0, 0.0),
        Coord3::new(0.0, 10.0, 0.0),
    ] {
        let mut m = Move::new(Coord3::zeros(), dst, 10.0, 50.0, 1000.0);
        m.blend_type = CornerBlendType::MinJerk;
        planner.append_move(m);
    }

    if let Err(e) = planner.calculate() {
        log::error!("planning failed: {e}");
        return;
    }

    let total = planner.traverse_time();
    log::info!("duration {total}");

    println!("t,x,y,z,speed");
    let mut t = 0.0;
    while t <= total {
        let s = planner.sample(t);
        println!(
            "{t:.3},{:.5},{:.5},{:.5},{:.5}",
            s.pos.x,
            s.pos.y,
            s.pos.z,
            s.vel.norm()
        );
        t += 0.001;
    }
}
