//! SequenceBaker tests
//!
//! Tests for:
//! - Channel matters detection in parent space
//! - Empty (motionless) sequences
//! - Cyclic last-frame removal
//! - Scale keys relative to the rest scale
//! - Action padding from IFL and visibility sources
//! - Visibility curves and IFL materials
//! - Ground frames
//! - Blend deltas against a reference pose
//! - Frame ordering and armature resets
//! - Degenerate animated scale
//! - Cancellation and host failures
//! - Playback timing

mod common;

use common::{MockScene, at, init_logger, quat_approx, vec3_approx};
use dts_baker::animation::{
    BakeOutcome, BakeStage, BakedSequence, PlaybackTiming, PoseSampler, SequenceBaker,
};
use dts_baker::config::{
    BlendReference, IflConfig, SequenceConfig, TimingLock, TriggerConfig, VisibilityConfig,
};
use dts_baker::diagnostics::{Diagnostic, ExportLog};
use dts_baker::errors::{BakeError, SceneError};
use dts_baker::export::CancelToken;
use dts_baker::math::Transform;
use dts_baker::scene::{NodeHierarchy, NodeHierarchyBuilder, RestPoseResolver};
use glam::{Quat, Vec3};
use std::f32::consts::FRAC_PI_2;

// ============================================================================
// Helpers
// ============================================================================

fn resolve(scene: &MockScene) -> NodeHierarchy {
    init_logger();
    let mut log = ExportLog::new();
    let mut hierarchy = NodeHierarchyBuilder::new(scene).build(&mut log);
    RestPoseResolver::new(scene)
        .resolve(&mut hierarchy, &mut log)
        .expect("rest poses resolve");
    hierarchy
}

fn node_index(hierarchy: &NodeHierarchy, name: &str) -> usize {
    hierarchy.find(name).expect("node exists").index as usize
}

fn sequence(name: &str, start: u32, end: u32) -> SequenceConfig {
    SequenceConfig {
        start_frame: start,
        end_frame: end,
        ..SequenceConfig::new(name)
    }
}

fn bake(scene: &mut MockScene, config: &SequenceConfig) -> (Result<BakeOutcome, BakeError>, ExportLog) {
    let hierarchy = resolve(scene);
    let mut log = ExportLog::new();
    let result = SequenceBaker::new(&hierarchy).bake(scene, config, &mut log);
    (result, log)
}

fn bake_ok(scene: &mut MockScene, config: &SequenceConfig) -> (BakedSequence, ExportLog) {
    let (result, log) = bake(scene, config);
    let baked = result.expect("bake succeeds").baked().expect("sequence has motion");
    (baked, log)
}

/// A single top-level object keyed along x, one key per frame.
fn mover_scene(xs: &[f32]) -> MockScene {
    let mut scene = MockScene::new();
    let mover = scene.add_object("Mover", None, at(0.0, 0.0, 0.0));
    scene.add_object("Still", None, at(0.0, 3.0, 0.0));
    for (i, &x) in xs.iter().enumerate() {
        scene.key_object(mover, None, i as u32 + 1, at(x, 0.0, 0.0));
    }
    scene
}

// ============================================================================
// Matters detection
// ============================================================================

#[test]
fn only_moving_channels_matter() {
    let mut scene = mover_scene(&[0.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
    let (baked, log) = bake_ok(&mut scene, &sequence("move", 1, 6));
    let hierarchy = resolve(&scene);
    let mover = node_index(&hierarchy, "Mover");
    let still = node_index(&hierarchy, "Still");

    let mask = baked.matters(mover);
    assert!(mask.translation);
    assert!(!mask.rotation);
    assert!(!mask.scale);
    assert!(!baked.matters(still).any());
    assert!(!baked.matters(0).any(), "the root never animates");

    assert_eq!(baked.num_key_frames, 6);
    let track = baked.tracks[mover].translations.as_ref().expect("translation track");
    assert_eq!(track.len(), 6);
    assert!(vec3_approx(track[4], Vec3::X));
    assert!(vec3_approx(track[5], Vec3::ZERO));
    assert!(log.is_empty());
}

#[test]
fn translation_below_epsilon_does_not_matter() {
    let mut scene = mover_scene(&[0.0, 1.0]);
    let still = scene.id("Still");
    scene.key_object(still, None, 2, at(5e-6, 3.0, 0.0));

    let (baked, _) = bake_ok(&mut scene, &sequence("tiny", 1, 2));
    let hierarchy = resolve(&scene);
    assert!(!baked.matters(node_index(&hierarchy, "Still")).translation);
    assert!(baked.matters(node_index(&hierarchy, "Mover")).translation);
}

#[test]
fn rotation_and_scale_are_detected_separately() {
    let mut scene = MockScene::new();
    let spinner = scene.add_object("Spinner", None, at(0.0, 0.0, 0.0));
    let grower = scene.add_object("Grower", None, at(2.0, 0.0, 0.0));
    scene.key_object(
        spinner,
        None,
        2,
        Transform::from_position_rotation(Vec3::ZERO, Quat::from_rotation_y(0.5)),
    );
    scene.key_object(
        grower,
        None,
        2,
        Transform::new(Vec3::new(2.0, 0.0, 0.0), Quat::IDENTITY, Vec3::new(1.0, 2.0, 1.0)),
    );

    let (baked, _) = bake_ok(&mut scene, &sequence("mixed", 1, 2));
    let hierarchy = resolve(&scene);
    let spinner = node_index(&hierarchy, "Spinner");
    let grower = node_index(&hierarchy, "Grower");

    assert_eq!(
        (baked.matters(spinner).translation, baked.matters(spinner).rotation, baked.matters(spinner).scale),
        (false, true, false)
    );
    assert_eq!(
        (baked.matters(grower).translation, baked.matters(grower).rotation, baked.matters(grower).scale),
        (false, false, true)
    );
    let scales = baked.tracks[grower].scales.as_ref().expect("scale track");
    assert!(vec3_approx(scales[1], Vec3::new(1.0, 2.0, 1.0)));
    let rotations = baked.tracks[spinner].rotations.as_ref().expect("rotation track");
    assert!(quat_approx(rotations[1], Quat::from_rotation_y(0.5)));
}

#[test]
fn child_bone_following_its_parent_does_not_matter() {
    let mut scene = MockScene::new();
    let rig = scene.add_object("Rig", None, at(0.0, 0.0, 0.0));
    let armature = scene.add_armature(rig);
    let hip = scene.add_bone(armature, "Hip", None, at(0.0, 0.0, 0.0));
    let tip = scene.add_bone(armature, "Tip", Some(hip), at(0.0, 1.0, 0.0));

    let turn = Quat::from_rotation_z(FRAC_PI_2);
    scene.key_bone(armature, hip, None, 2, Transform::from_position_rotation(Vec3::ZERO, turn));
    scene.key_bone(
        armature,
        tip,
        None,
        2,
        Transform::from_position_rotation(turn * Vec3::Y, turn),
    );

    let (baked, _) = bake_ok(&mut scene, &sequence("turn", 1, 2));
    let hierarchy = resolve(&scene);
    let hip = node_index(&hierarchy, "Hip");
    let tip = node_index(&hierarchy, "Tip");
    let rig = node_index(&hierarchy, "Rig");

    assert!(baked.matters(hip).rotation);
    assert!(!baked.matters(hip).translation);
    assert!(!baked.matters(tip).any());
    assert!(!baked.matters(rig).any());
}

// ============================================================================
// Empty sequences
// ============================================================================

#[test]
fn motionless_sequence_is_empty() {
    let mut scene = mover_scene(&[]);
    let (result, log) = bake(&mut scene, &sequence("idle", 1, 8));

    assert!(matches!(result, Ok(BakeOutcome::Empty)));
    assert_eq!(
        log.count(|d| matches!(d, Diagnostic::EmptySequence { sequence } if sequence == "idle")),
        1
    );
}

// ============================================================================
// Cyclic sequences
// ============================================================================

#[test]
fn cyclic_sequence_drops_duplicate_last_frame() {
    let xs = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 4.0, 3.0, 2.0, 0.0];
    let mut scene = mover_scene(&xs);
    let config = SequenceConfig {
        cyclic: true,
        ..sequence("loop", 1, 10)
    };
    let (baked, _) = bake_ok(&mut scene, &config);
    let hierarchy = resolve(&scene);
    let mover = node_index(&hierarchy, "Mover");

    assert_eq!(baked.num_key_frames, 9);
    assert!(baked.cyclic);
    let track = baked.tracks[mover].translations.as_ref().expect("translation track");
    assert_eq!(track.len(), 9);
    assert!(vec3_approx(track[8], Vec3::new(2.0, 0.0, 0.0)));
}

#[test]
fn cyclic_sequence_keeps_last_frame_when_it_differs() {
    let xs = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 4.0, 3.0, 2.0, 0.5];
    let mut scene = mover_scene(&xs);
    let config = SequenceConfig {
        cyclic: true,
        ..sequence("loop", 1, 10)
    };
    let (baked, _) = bake_ok(&mut scene, &config);
    assert_eq!(baked.num_key_frames, 10);
}

#[test]
fn cyclic_sequence_needs_every_channel_to_loop() {
    let mut scene = mover_scene(&[0.0, 1.0, 0.0]);
    let still = scene.id("Still");
    scene.key_object(still, None, 3, at(0.0, 4.0, 0.0));
    let config = SequenceConfig {
        cyclic: true,
        ..sequence("loop", 1, 3)
    };
    let (baked, _) = bake_ok(&mut scene, &config);
    assert_eq!(baked.num_key_frames, 3);
}

#[test]
fn non_cyclic_sequence_keeps_duplicate_last_frame() {
    let mut scene = mover_scene(&[0.0, 1.0, 0.0]);
    let (baked, _) = bake_ok(&mut scene, &sequence("once", 1, 3));
    assert_eq!(baked.num_key_frames, 3);
}

// ============================================================================
// Padding
// ============================================================================

#[test]
fn ifl_longer_than_action_pads_with_last_frame() {
    let xs: Vec<f32> = (1..=10).map(|f| f as f32).collect();
    let mut scene = mover_scene(&xs);
    let config = SequenceConfig {
        cyclic: true,
        ifl: Some(IflConfig {
            material: "flame".into(),
            frame_holds: vec![4, 4, 4],
        }),
        ..sequence("burn", 1, 10)
    };
    let (baked, _) = bake_ok(&mut scene, &config);
    let hierarchy = resolve(&scene);
    let mover = node_index(&hierarchy, "Mover");

    assert_eq!(baked.num_key_frames, 12, "padded frames are never dropped");
    let track = baked.tracks[mover].translations.as_ref().expect("translation track");
    assert_eq!(track.len(), 12);
    assert!(vec3_approx(track[9], Vec3::new(10.0, 0.0, 0.0)));
    assert!(vec3_approx(track[10], Vec3::new(10.0, 0.0, 0.0)));
    assert!(vec3_approx(track[11], Vec3::new(10.0, 0.0, 0.0)));
    assert_eq!(scene.visited_frames, (1..=12).collect::<Vec<_>>());
}

#[test]
fn visibility_span_extends_frame_count() {
    let mut scene = mover_scene(&[0.0, 1.0, 2.0]);
    let config = SequenceConfig {
        visibility: Some(VisibilityConfig {
            start_frame: 1,
            end_frame: 5,
            objects: Vec::new(),
        }),
        ..sequence("fade", 1, 3)
    };
    let (baked, _) = bake_ok(&mut scene, &config);
    assert_eq!(baked.num_key_frames, 5);
}

#[test]
fn action_shorter_than_range_limits_frames() {
    let mut scene = mover_scene(&[0.0, 1.0, 2.0, 3.0]);
    scene.set_action_frames("Short", 4);
    let config = SequenceConfig {
        action: Some("Short".into()),
        ..sequence("short", 1, 10)
    };
    let (baked, _) = bake_ok(&mut scene, &config);
    assert_eq!(baked.num_key_frames, 4);
}

#[test]
fn unknown_action_uses_frame_range_with_warning() {
    let mut scene = mover_scene(&[0.0, 1.0, 2.0]);
    let config = SequenceConfig {
        action: Some("Ghost".into()),
        ..sequence("ghost", 1, 3)
    };
    let (baked, log) = bake_ok(&mut scene, &config);
    assert_eq!(baked.num_key_frames, 3);
    assert_eq!(
        log.count(|d| matches!(d, Diagnostic::UnknownAction { action, .. } if action == "Ghost")),
        1
    );
    assert_eq!(scene.actions_set.first(), Some(&Some("Ghost".to_string())));
}

// ============================================================================
// Ground frames
// ============================================================================

fn ground_scene(frames: u32) -> MockScene {
    let mut scene = mover_scene(&[0.0, 1.0]);
    let bounds = scene.add_object("Bounds", None, at(0.0, 0.0, 0.0));
    for f in 1..=frames {
        scene.key_object(bounds, None, f, at(f as f32 + 2.0, 0.0, 0.0));
    }
    scene
}

#[test]
fn ground_frames_are_evenly_spaced_and_relative_to_first_frame() {
    let mut scene = ground_scene(10);
    let config = SequenceConfig {
        ground_frames: 5,
        ..sequence("walk", 1, 10)
    };
    let (baked, log) = bake_ok(&mut scene, &config);

    // Spacing 2: samples 1, 3, 5, 7, 9 -> host frames 2, 4, 6, 8, 10.
    let xs: Vec<f32> = baked.ground_frames.iter().map(|g| g.translation.x).collect();
    assert_eq!(xs.len(), 5);
    for (x, expected) in xs.iter().zip([1.0, 3.0, 5.0, 7.0, 9.0]) {
        assert!((x - expected).abs() < 1e-4, "{x} != {expected}");
    }
    assert!(baked.ground_frames.iter().all(|g| quat_approx(g.rotation, Quat::IDENTITY)));
    assert!(log.is_empty());
}

#[test]
fn ground_frames_never_exceed_target() {
    for target in [1, 2, 3, 4, 6, 7, 9, 10, 25] {
        let mut scene = ground_scene(10);
        let config = SequenceConfig {
            ground_frames: target,
            ..sequence("walk", 1, 10)
        };
        let (baked, _) = bake_ok(&mut scene, &config);
        assert!(
            baked.ground_frames.len() <= target.min(10) as usize,
            "target {target}: {} ground frames",
            baked.ground_frames.len()
        );
        assert!(!baked.ground_frames.is_empty());
    }
}

#[test]
fn single_ground_frame_is_taken_at_the_end() {
    let mut scene = ground_scene(4);
    let config = SequenceConfig {
        ground_frames: 1,
        ..sequence("walk", 1, 4)
    };
    let (baked, _) = bake_ok(&mut scene, &config);
    assert_eq!(baked.ground_frames.len(), 1);
    assert!(vec3_approx(baked.ground_frames[0].translation, Vec3::new(3.0, 0.0, 0.0)));
}

#[test]
fn missing_ground_proxy_warns_and_skips_ground_frames() {
    let mut scene = mover_scene(&[0.0, 1.0, 2.0]);
    let config = SequenceConfig {
        ground_frames: 3,
        ..sequence("walk", 1, 3)
    };
    let (baked, log) = bake_ok(&mut scene, &config);
    assert!(baked.ground_frames.is_empty());
    assert_eq!(
        log.count(|d| matches!(d, Diagnostic::MissingGroundProxy { sequence } if sequence == "walk")),
        1
    );
}

// ============================================================================
// Blend sequences
// ============================================================================

fn blend_scene(walk: &[f32]) -> MockScene {
    let mut scene = MockScene::new();
    let mover = scene.add_object("Mover", None, at(0.0, 0.0, 0.0));
    scene.key_object(mover, Some("Ref"), 1, at(2.0, 0.0, 0.0));
    for (i, &x) in walk.iter().enumerate() {
        scene.key_object(mover, Some("Walk"), i as u32 + 1, at(x, 0.0, 0.0));
    }
    scene.set_action_frames("Ref", 1);
    scene.set_action_frames("Walk", walk.len() as u32);
    scene
}

fn blend_config(frame: u32, frames: u32) -> SequenceConfig {
    SequenceConfig {
        action: Some("Walk".into()),
        blend: Some(BlendReference {
            action: "Ref".into(),
            frame,
        }),
        ..sequence("lean", 1, frames)
    }
}

#[test]
fn blend_keys_are_deltas_against_reference() {
    let mut scene = blend_scene(&[2.0, 3.0, 2.0]);
    let (baked, log) = bake_ok(&mut scene, &blend_config(1, 3));
    let hierarchy = resolve(&scene);
    let mover = node_index(&hierarchy, "Mover");

    assert!(baked.blend);
    let track = baked.tracks[mover].translations.as_ref().expect("translation track");
    assert!(vec3_approx(track[0], Vec3::ZERO));
    assert!(vec3_approx(track[1], Vec3::X));
    assert!(vec3_approx(track[2], Vec3::ZERO));
    assert!(log.is_empty());
}

#[test]
fn blend_reference_action_does_not_leak_into_samples() {
    let mut scene = blend_scene(&[2.0, 3.0, 2.0]);
    let _ = bake_ok(&mut scene, &blend_config(1, 3));
    assert_eq!(
        scene.actions_set,
        vec![Some("Walk".to_string()), Some("Ref".to_string()), Some("Walk".to_string())]
    );
}

#[test]
fn blend_equal_to_reference_is_empty() {
    let mut scene = blend_scene(&[2.0, 2.0, 2.0]);
    let (result, log) = bake(&mut scene, &blend_config(1, 3));
    assert!(matches!(result, Ok(BakeOutcome::Empty)));
    assert_eq!(log.count(|d| matches!(d, Diagnostic::EmptySequence { .. })), 1);
}

#[test]
fn out_of_range_reference_frame_falls_back_to_first() {
    let mut scene = blend_scene(&[2.0, 3.0, 2.0]);
    let (baked, log) = bake_ok(&mut scene, &blend_config(5, 3));
    let hierarchy = resolve(&scene);
    let mover = node_index(&hierarchy, "Mover");

    let track = baked.tracks[mover].translations.as_ref().expect("translation track");
    assert!(vec3_approx(track[1], Vec3::X));
    assert_eq!(
        log.count(|d| matches!(
            d,
            Diagnostic::ReferencePoseOutOfRange { frame: 5, frame_count: 1, .. }
        )),
        1
    );
}

#[test]
fn blend_rotation_delta_is_relative_to_reference() {
    let mut scene = MockScene::new();
    let mover = scene.add_object("Mover", None, at(0.0, 0.0, 0.0));
    let base = Quat::from_rotation_z(0.4);
    let posed = base * Quat::from_rotation_x(0.3);
    scene.key_object(mover, Some("Ref"), 1, Transform::from_position_rotation(Vec3::ZERO, base));
    scene.key_object(mover, Some("Walk"), 1, Transform::from_position_rotation(Vec3::ZERO, base));
    scene.key_object(mover, Some("Walk"), 2, Transform::from_position_rotation(Vec3::ZERO, posed));
    scene.set_action_frames("Ref", 1);
    scene.set_action_frames("Walk", 2);

    let (baked, _) = bake_ok(&mut scene, &blend_config(1, 2));
    let hierarchy = resolve(&scene);
    let mover = node_index(&hierarchy, "Mover");
    let rotations = baked.tracks[mover].rotations.as_ref().expect("rotation track");
    assert!(quat_approx(rotations[0], Quat::IDENTITY));
    assert!(quat_approx(rotations[1], Quat::from_rotation_x(0.3)));
}

// ============================================================================
// Host interaction
// ============================================================================

#[test]
fn frames_are_visited_in_increasing_order() {
    let mut scene = mover_scene(&[0.0, 0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    let _ = bake_ok(&mut scene, &sequence("part", 3, 7));
    assert_eq!(scene.visited_frames, vec![3, 4, 5, 6, 7]);
}

#[test]
fn armatures_are_reset_before_sampling() {
    let mut scene = mover_scene(&[0.0, 1.0]);
    let rig = scene.add_object("Rig", None, at(0.0, 0.0, 0.0));
    let armature = scene.add_armature(rig);
    scene.add_bone(armature, "Hip", None, at(0.0, 0.0, 0.0));

    let _ = bake_ok(&mut scene, &sequence("move", 1, 2));
    assert_eq!(scene.resets, vec![armature]);
}

#[test]
fn triggers_are_carried_to_the_baked_sequence() {
    let mut scene = mover_scene(&[0.0, 1.0, 2.0]);
    let triggers = vec![
        TriggerConfig { state: 1, frame: 1, activates: true },
        TriggerConfig { state: 2, frame: 3, activates: false },
    ];
    let config = SequenceConfig {
        triggers: triggers.clone(),
        priority: 4,
        ..sequence("step", 1, 3)
    };
    let (baked, _) = bake_ok(&mut scene, &config);
    assert_eq!(baked.trigger_markers, triggers);
    assert_eq!(baked.priority, 4);
}

#[test]
fn unresolved_hierarchy_is_rejected() {
    let mut scene = mover_scene(&[0.0, 1.0]);
    let mut log = ExportLog::new();
    let hierarchy = NodeHierarchyBuilder::new(&scene).build(&mut log);
    let result = SequenceBaker::new(&hierarchy).bake(&mut scene, &sequence("move", 1, 2), &mut log);
    assert!(matches!(result, Err(BakeError::RestPoseUnresolved)));
    assert!(scene.visited_frames.is_empty());
}

// ============================================================================
// Cancellation & failures
// ============================================================================

#[test]
fn cancelled_before_start_bakes_nothing() {
    let mut scene = mover_scene(&[0.0, 1.0, 2.0]);
    let hierarchy = resolve(&scene);
    let token = CancelToken::new();
    token.cancel();

    let mut log = ExportLog::new();
    let result = SequenceBaker::new(&hierarchy)
        .with_cancel_token(&token)
        .bake(&mut scene, &sequence("move", 1, 3), &mut log);

    let err = result.expect_err("cancelled");
    assert!(err.is_cancelled());
    assert!(matches!(err, BakeError::Sequence { stage: BakeStage::Init, .. }));
    assert!(scene.visited_frames.is_empty());
}

#[test]
fn cancelled_mid_sequence_stops_before_next_frame() {
    let mut scene = mover_scene(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    let hierarchy = resolve(&scene);
    let token = CancelToken::new();
    scene.cancel_at_frame = Some((3, token.clone()));

    let mut log = ExportLog::new();
    let result = SequenceBaker::new(&hierarchy)
        .with_cancel_token(&token)
        .bake(&mut scene, &sequence("move", 1, 6), &mut log);

    let err = result.expect_err("cancelled");
    assert!(err.is_cancelled());
    assert!(matches!(err, BakeError::Sequence { stage: BakeStage::SampleLoop, .. }));
    assert_eq!(scene.visited_frames, vec![1, 2, 3]);
}

#[test]
fn host_failure_reports_sequence_and_stage() {
    let mut scene = mover_scene(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    scene.fail_at_frame = Some(4);
    let (result, _) = bake(&mut scene, &sequence("broken", 1, 6));

    match result {
        Err(BakeError::Sequence { name, stage, source }) => {
            assert_eq!(name, "broken");
            assert_eq!(stage, BakeStage::SampleLoop);
            assert!(matches!(*source, BakeError::Scene(SceneError::Host(_))));
        }
        other => panic!("expected a sequence error, got {other:?}"),
    }
    assert!(!BakeError::RestPoseUnresolved.is_cancelled());
}

// ============================================================================
// Timing
// ============================================================================

#[test]
fn fps_lock_derives_duration() {
    let config = SequenceConfig {
        fps: 30.0,
        ..SequenceConfig::new("t")
    };
    let timing = PlaybackTiming::reconcile(&config, 10);
    assert_eq!(timing.fps, 30.0);
    assert!((timing.duration - 1.0 / 3.0).abs() < 1e-5);
}

#[test]
fn duration_lock_derives_fps() {
    let config = SequenceConfig {
        lock: TimingLock::Duration,
        duration: 2.0,
        ..SequenceConfig::new("t")
    };
    let timing = PlaybackTiming::reconcile(&config, 10);
    assert_eq!(timing.duration, 2.0);
    assert!((timing.fps - 5.0).abs() < 1e-5);
}

#[test]
fn timing_is_clamped() {
    let fast = SequenceConfig {
        fps: 1000.0,
        ..SequenceConfig::new("t")
    };
    assert_eq!(PlaybackTiming::reconcile(&fast, 10).fps, 255.0);

    let short = SequenceConfig {
        lock: TimingLock::Duration,
        duration: 0.0001,
        ..SequenceConfig::new("t")
    };
    let timing = PlaybackTiming::reconcile(&short, 2);
    assert!((timing.duration - 1.0 / 255.0).abs() < 1e-6);
    assert_eq!(timing.fps, 255.0);
}

#[test]
fn timing_is_reconciled_before_cyclic_drop() {
    let mut scene = mover_scene(&[0.0, 1.0, 2.0, 1.0, 0.0]);
    let config = SequenceConfig {
        cyclic: true,
        fps: 10.0,
        ..sequence("loop", 1, 5)
    };
    let (baked, _) = bake_ok(&mut scene, &config);
    assert_eq!(baked.num_key_frames, 4);
    assert!((baked.timing.duration - 0.5).abs() < 1e-5);
}

// ============================================================================
// Rest scale
// ============================================================================

/// A, then B with rest scale 2, then C. Nothing is keyed.
fn scaled_parent_scene() -> MockScene {
    let mut scene = MockScene::new();
    let a = scene.add_object("A", None, at(1.0, 0.0, 0.0));
    let b = scene.add_object(
        "B",
        Some(a),
        Transform::new(Vec3::new(1.0, 2.0, 0.0), Quat::IDENTITY, Vec3::splat(2.0)),
    );
    let c = scene.add_object("C", Some(b), at(3.0, 2.0, 0.0));
    scene.object_mut(c).rest_scale = Vec3::ONE;
    scene
}

#[test]
fn static_scaled_node_is_empty() {
    let mut scene = scaled_parent_scene();
    let (result, log) = bake(&mut scene, &sequence("idle", 1, 5));

    assert!(matches!(result, Ok(BakeOutcome::Empty)));
    assert_eq!(
        log.count(|d| matches!(d, Diagnostic::EmptySequence { sequence } if sequence == "idle")),
        1
    );
}

#[test]
fn scale_keys_are_relative_to_rest_scale() {
    let mut scene = scaled_parent_scene();
    let b = scene.id("B");
    scene.key_object(
        b,
        None,
        2,
        Transform::new(Vec3::new(1.0, 2.0, 0.0), Quat::IDENTITY, Vec3::new(2.0, 4.0, 2.0)),
    );

    let (baked, _) = bake_ok(&mut scene, &sequence("swell", 1, 2));
    let hierarchy = resolve(&scene);
    let b = node_index(&hierarchy, "B");

    let scales = baked.tracks[b].scales.as_ref().expect("scale track");
    assert!(vec3_approx(scales[0], Vec3::ONE));
    assert!(vec3_approx(scales[1], Vec3::new(1.0, 2.0, 1.0)));
}

// ============================================================================
// Single-node sampling
// ============================================================================

#[test]
fn sampling_one_node_moves_the_host_to_each_frame() {
    let mut scene = mover_scene(&[0.0, 1.0, 4.0]);
    let hierarchy = resolve(&scene);
    let mover = hierarchy.find("Mover").expect("node exists");
    let sampler = PoseSampler::default();

    let second = sampler.sample(&mut scene, mover, 2).expect("frame 2 samples");
    let third = sampler.sample(&mut scene, mover, 3).expect("frame 3 samples");

    assert!(vec3_approx(second.position, Vec3::X));
    assert!(vec3_approx(third.position, Vec3::new(4.0, 0.0, 0.0)));
    assert_eq!(scene.visited_frames, vec![2, 3]);
}

// ============================================================================
// Visibility & IFL
// ============================================================================

fn lamp_scene(curve: &[f32]) -> MockScene {
    let mut scene = mover_scene(&[0.0, 1.0, 2.0, 3.0, 4.0]);
    let lamp = scene.add_object("Lamp", None, at(0.0, 0.0, 5.0));
    scene.set_visibility(lamp, curve);
    scene
}

fn fade(objects: &[&str], start_frame: u32, end_frame: u32) -> Option<VisibilityConfig> {
    Some(VisibilityConfig {
        start_frame,
        end_frame,
        objects: objects.iter().map(|o| (*o).to_string()).collect(),
    })
}

#[test]
fn visibility_is_clamped_and_holds_past_end_frame() {
    let mut scene = lamp_scene(&[0.5, 1.7, -0.2, 0.9, 0.3]);
    let config = SequenceConfig {
        visibility: fade(&["Lamp"], 1, 3),
        ..sequence("flicker", 1, 5)
    };
    let (baked, log) = bake_ok(&mut scene, &config);
    let hierarchy = resolve(&scene);
    let lamp = node_index(&hierarchy, "Lamp");

    assert_eq!(baked.num_key_frames, 5);
    assert_eq!(baked.visibility[lamp].as_deref(), Some(&[0.5, 1.0, 0.0, 0.0, 0.0][..]));
    assert_eq!(baked.matters_visibility().filter(|&m| m).count(), 1);
    assert!(log.is_empty());
}

#[test]
fn visibility_starts_at_its_own_frame() {
    let mut scene = lamp_scene(&[0.5, 1.7, 0.25, 0.75]);
    let config = SequenceConfig {
        visibility: fade(&["Lamp"], 3, 4),
        ..sequence("late", 1, 4)
    };
    let (baked, _) = bake_ok(&mut scene, &config);
    let hierarchy = resolve(&scene);
    let lamp = node_index(&hierarchy, "Lamp");

    assert_eq!(baked.visibility[lamp].as_deref(), Some(&[0.25, 0.75, 0.75, 0.75][..]));
}

#[test]
fn objects_without_visibility_curve_are_reported() {
    let mut scene = lamp_scene(&[1.0, 0.0]);
    let config = SequenceConfig {
        visibility: fade(&["Still", "Ghost", "Lamp"], 1, 2),
        ..sequence("blink", 1, 2)
    };
    let (baked, log) = bake_ok(&mut scene, &config);
    let hierarchy = resolve(&scene);

    assert!(baked.visibility[node_index(&hierarchy, "Still")].is_none());
    assert!(baked.visibility[node_index(&hierarchy, "Lamp")].is_some());
    assert_eq!(baked.visibility.len(), hierarchy.len());
    assert_eq!(
        log.count(|d| matches!(d, Diagnostic::MissingVisibilityTrack { object, .. } if object == "Still" || object == "Ghost")),
        2
    );
}

#[test]
fn visibility_alone_keeps_a_sequence() {
    let mut scene = MockScene::new();
    let lamp = scene.add_object("Lamp", None, at(0.0, 0.0, 0.0));
    scene.set_visibility(lamp, &[1.0, 0.0]);
    let config = SequenceConfig {
        visibility: fade(&["Lamp"], 1, 2),
        ..sequence("blink", 1, 2)
    };

    let (baked, log) = bake_ok(&mut scene, &config);
    assert!(!baked.tracks.iter().any(|t| t.matters().any()));
    assert_eq!(baked.visibility.iter().flatten().count(), 1);
    assert_eq!(log.count(|d| matches!(d, Diagnostic::EmptySequence { .. })), 0);
}

#[test]
fn cyclic_drop_also_trims_visibility() {
    let mut scene = mover_scene(&[0.0, 1.0, 0.0]);
    let lamp = scene.add_object("Lamp", None, at(0.0, 0.0, 5.0));
    scene.set_visibility(lamp, &[0.2, 0.5, 0.2]);
    let config = SequenceConfig {
        cyclic: true,
        visibility: fade(&["Lamp"], 1, 3),
        ..sequence("pulse", 1, 3)
    };

    let (baked, _) = bake_ok(&mut scene, &config);
    let hierarchy = resolve(&scene);
    assert_eq!(baked.num_key_frames, 2);
    assert_eq!(
        baked.visibility[node_index(&hierarchy, "Lamp")].as_deref(),
        Some(&[0.2, 0.5][..])
    );
}

fn burning(material: &str) -> SequenceConfig {
    SequenceConfig {
        ifl: Some(IflConfig {
            material: material.into(),
            frame_holds: vec![1, 1],
        }),
        ..sequence("burn", 1, 2)
    }
}

#[test]
fn ifl_matters_flags_the_configured_material() {
    let mut scene = mover_scene(&[0.0, 1.0]);
    scene.ifl_materials = vec!["water.ifl".into(), "flame.ifl".into()];

    let (baked, log) = bake_ok(&mut scene, &burning("flame"));
    assert_eq!(baked.matters_ifl, vec![false, true]);
    assert!(log.is_empty());
}

#[test]
fn unknown_ifl_material_is_reported() {
    let mut scene = mover_scene(&[0.0, 1.0]);
    scene.ifl_materials = vec!["water.ifl".into()];

    let (baked, log) = bake_ok(&mut scene, &burning("smoke"));
    assert_eq!(baked.matters_ifl, vec![false]);
    assert_eq!(
        log.count(|d| matches!(d, Diagnostic::UnknownIflMaterial { material, .. } if material == "smoke")),
        1
    );
}

#[test]
fn ifl_alone_keeps_a_sequence() {
    let mut scene = MockScene::new();
    scene.add_object("Torch", None, at(0.0, 0.0, 0.0));
    scene.ifl_materials = vec!["flame.ifl".into()];

    let (result, _) = bake(&mut scene, &burning("flame"));
    let baked = result.expect("bake succeeds").baked().expect("IFL keeps the sequence");
    assert_eq!(baked.matters_ifl, vec![true]);
}

// ============================================================================
// Degenerate animated scale
// ============================================================================

#[test]
fn parent_scale_collapsing_to_zero_is_reported_once() {
    let mut scene = MockScene::new();
    let parent = scene.add_object("Parent", None, at(0.0, 0.0, 0.0));
    scene.add_object("Child", Some(parent), at(1.0, 0.0, 0.0));
    for frame in 2..=4 {
        scene.key_object(
            parent,
            None,
            frame,
            Transform::new(Vec3::ZERO, Quat::IDENTITY, Vec3::new(1.0, 0.0, 1.0)),
        );
    }

    let (_, log) = bake_ok(&mut scene, &sequence("squash", 1, 4));
    assert_eq!(
        log.count(|d| matches!(
            d,
            Diagnostic::DegenerateAnimatedScale { node, ancestor, frame: 2, .. }
                if node == "Child" && ancestor == "Parent"
        )),
        1
    );
    assert_eq!(log.len(), 1);
}
