use std::f32::consts::PI;

use bevy::prelude::*;

use crate::shovel::{ShovelActuator, ShovelController, ShovelPosition};
use crate::test_harness::TestYard;

#[test]
fn test_controller_reaches_loading_through_fixed_ticks() {
    let mut yard = TestYard::new();
    let loader = yard.spawn_wheel_loader(1, 1, Vec3::ZERO, 0.0, 2000.0);
    let mut controller = ShovelController::new(loader.shovel);

    assert!(!controller.move_to_loading_position(yard.world_mut()));
    let ticks = yard.tick_until(50, |world| controller.move_to_loading_position(world));
    assert!(ticks.is_some(), "shovel never reached the loading pose");
    assert_eq!(controller.state(), ShovelPosition::Loading);

    controller.on_finished(yard.world_mut());
    assert_eq!(controller.state(), ShovelPosition::Deactivated);
    let actuator = yard.world().get::<ShovelActuator>(loader.shovel).unwrap();
    assert_eq!(actuator.target, None);

    // parked: further ticks leave the shovel where it stopped
    let pose = (actuator.arm_height, actuator.tip_factor);
    yard.tick(5);
    let actuator = yard.world().get::<ShovelActuator>(loader.shovel).unwrap();
    assert_eq!((actuator.arm_height, actuator.tip_factor), pose);
}

#[test]
fn test_shovel_tip_over_facing_target() {
    let mut yard = TestYard::new();
    let loader = yard.spawn_wheel_loader(1, 1, Vec3::ZERO, 0.0, 2000.0);
    let controller = ShovelController::new(loader.shovel);
    // tip at z = 4.8; triggers face back toward the loader

    let close = yard.spawn_unload_trigger(Vec3::new(0.0, 0.0, 5.0), PI);
    let far = yard.spawn_unload_trigger(Vec3::new(0.0, 0.0, 20.0), PI);
    let passed = yard.spawn_unload_trigger(Vec3::new(0.0, 0.0, 2.0), PI);
    assert!(controller.is_over_target(yard.world(), close, 0.5));
    assert!(!controller.is_over_target(yard.world(), far, 0.5));
    assert!(controller.is_over_target(yard.world(), passed, 0.5));
}
