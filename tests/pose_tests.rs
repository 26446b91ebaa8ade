//! Pose Evaluation Tests
//!
//! Tests for:
//! - Skeleton validation and parent-major evaluation order
//! - Hierarchical composition (global = parent.global × local)
//! - Key index computation, wrapping and the seam at key 0
//! - Out-of-range key fallback (identity / zero / zero scale)
//! - Stepped vs interpolated sampling policies
//! - Construction errors

use std::f32::consts::{FRAC_PI_2, FRAC_PI_6};
use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};

use orrery::animation::clip::{AnimationChannel, AnimationClip, Keyframe, QuatKey, VectorKey};
use orrery::animation::pose::PoseEvaluator;
use orrery::errors::OrreryError;
use orrery::scene::skeleton::{Bone, Skeleton};
use orrery::settings::{AnimationSettings, SamplingPolicy};

const EPSILON: f32 = 1e-5;

fn mat_approx(a: Mat4, b: Mat4) -> bool {
    a.abs_diff_eq(b, EPSILON)
}

fn bone(id: usize, parent: Option<usize>, transform: Mat4) -> Bone {
    Bone::new(id, parent, transform, Mat4::IDENTITY)
}

fn vkeys(values: &[Vec3]) -> Vec<VectorKey> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| Keyframe::new(i as f32, v))
        .collect()
}

fn qkeys(values: &[Quat]) -> Vec<QuatKey> {
    values
        .iter()
        .enumerate()
        .map(|(i, &q)| Keyframe::new(i as f32, q))
        .collect()
}

/// Channel holding one rigid key per entry of `positions`.
fn rigid_channel(bone_id: usize, positions: &[Vec3]) -> AnimationChannel {
    AnimationChannel::new(bone_id)
        .with_position_keys(vkeys(positions))
        .with_rotation_keys(qkeys(&vec![Quat::IDENTITY; positions.len()]))
        .with_scale_keys(vkeys(&vec![Vec3::ONE; positions.len()]))
}

fn unscaled() -> AnimationSettings {
    AnimationSettings {
        policy: SamplingPolicy::Stepped,
        duration_scale: 1.0,
    }
}

fn evaluator(
    skeleton: Skeleton,
    clip: AnimationClip,
    settings: AnimationSettings,
) -> PoseEvaluator {
    PoseEvaluator::new(Arc::new(skeleton), &[Arc::new(clip)], settings).unwrap()
}

// ============================================================================
// Skeleton
// ============================================================================

#[test]
fn skeleton_roots_keep_declaration_order() {
    let skeleton = Skeleton::new(
        "forest",
        vec![
            bone(0, Some(2), Mat4::IDENTITY),
            bone(1, None, Mat4::IDENTITY),
            bone(2, None, Mat4::IDENTITY),
        ],
    )
    .unwrap();

    assert_eq!(skeleton.roots(), &[1, 2]);
    assert_eq!(skeleton.evaluation_order(), &[1, 2, 0]);
    assert_eq!(skeleton.children(2), &[0]);
}

#[test]
fn skeleton_rejects_duplicate_id() {
    let err = Skeleton::new(
        "dup",
        vec![bone(0, None, Mat4::IDENTITY), bone(0, None, Mat4::IDENTITY)],
    )
    .unwrap_err();
    assert!(matches!(err, OrreryError::InvalidSkeleton(_)));
}

#[test]
fn skeleton_rejects_missing_parent() {
    let err = Skeleton::new(
        "orphan",
        vec![bone(0, None, Mat4::IDENTITY), bone(1, Some(7), Mat4::IDENTITY)],
    )
    .unwrap_err();
    assert!(matches!(err, OrreryError::InvalidSkeleton(_)));
}

#[test]
fn skeleton_rejects_sparse_ids() {
    let err = Skeleton::new(
        "sparse",
        vec![bone(0, None, Mat4::IDENTITY), bone(5, Some(0), Mat4::IDENTITY)],
    )
    .unwrap_err();
    assert!(matches!(err, OrreryError::InvalidSkeleton(_)));
}

// ============================================================================
// Hierarchical Composition
// ============================================================================

#[test]
fn unanimated_bones_compose_bind_transforms() {
    let root = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));
    let mid = Mat4::from_rotation_z(FRAC_PI_2);
    let tip = Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0));
    // Bone 3 carries the only channel, so the chain stays in bind pose.
    let skeleton = Skeleton::new(
        "chain",
        vec![
            bone(0, None, root),
            bone(1, Some(0), mid),
            bone(2, Some(1), tip),
            bone(3, None, Mat4::IDENTITY),
        ],
    )
    .unwrap();
    let clip = AnimationClip::new("idle", 1.0, vec![rigid_channel(3, &[Vec3::ZERO])]);

    let pose = evaluator(skeleton, clip, unscaled()).evaluate(0.0);
    let g = pose.globals();

    assert!(mat_approx(g[0], root), "root global must equal its local");
    assert!(mat_approx(g[1], g[0] * mid));
    assert!(mat_approx(g[2], g[1] * tip));
}

#[test]
fn animated_child_composes_with_animated_parent() {
    let skeleton = Skeleton::new(
        "pair",
        vec![bone(0, None, Mat4::IDENTITY), bone(1, Some(0), Mat4::IDENTITY)],
    )
    .unwrap();
    let clip = AnimationClip::new(
        "wave",
        1.0,
        vec![
            rigid_channel(0, &[Vec3::new(0.0, 0.0, 3.0)]),
            AnimationChannel::new(1)
                .with_position_keys(vkeys(&[Vec3::X]))
                .with_rotation_keys(qkeys(&[Quat::from_rotation_x(FRAC_PI_6)]))
                .with_scale_keys(vkeys(&[Vec3::splat(2.0)])),
        ],
    );

    let pose = evaluator(skeleton, clip, unscaled()).evaluate(0.2);
    let g = pose.globals();

    let child_local = Mat4::from_translation(Vec3::X)
        * Mat4::from_quat(Quat::from_rotation_x(FRAC_PI_6))
        * Mat4::from_scale(Vec3::splat(2.0));
    assert!(mat_approx(g[1], g[0] * child_local));
}

#[test]
fn skin_matrix_applies_offset() {
    let offset = Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0));
    let skeleton = Skeleton::new(
        "one",
        vec![Bone::new(0, None, Mat4::IDENTITY, offset)],
    )
    .unwrap();
    let clip = AnimationClip::new("lift", 1.0, vec![rigid_channel(0, &[Vec3::Y])]);

    let pose = evaluator(skeleton, clip, unscaled()).evaluate(0.0);
    assert!(mat_approx(pose.skin_matrices()[0], pose.globals()[0] * offset));
    assert!(mat_approx(pose.skin_matrices()[0], Mat4::IDENTITY));
}

// ============================================================================
// Two-bone quarter turn
// ============================================================================

#[test]
fn two_bone_quarter_turn_about_y() {
    let rot = Quat::from_rotation_y(FRAC_PI_2);
    let child_bind = Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0));
    let skeleton = Skeleton::new(
        "arm",
        vec![bone(0, None, Mat4::IDENTITY), bone(1, Some(0), child_bind)],
    )
    .unwrap();
    let clip = AnimationClip::new(
        "turn",
        2.0,
        vec![
            AnimationChannel::new(0)
                .with_rotation_keys(qkeys(&[rot]))
                .with_position_keys(vkeys(&[Vec3::ZERO]))
                .with_scale_keys(vkeys(&[Vec3::ONE])),
        ],
    );
    let eval = evaluator(skeleton, clip, AnimationSettings::default());

    for t in [0.0, 0.1, 0.49, 3.7, 1234.5] {
        let pose = eval.evaluate(t);
        let g = pose.globals();
        assert!(mat_approx(g[0], Mat4::from_quat(rot)), "t = {t}");
        assert!(mat_approx(g[1], Mat4::from_quat(rot) * child_bind), "t = {t}");

        // A pure Y rotation leaves the child's +Y offset in place.
        let tip = g[1].transform_point3(Vec3::ZERO);
        assert!(tip.abs_diff_eq(Vec3::new(0.0, 1.0, 0.0), EPSILON), "t = {t}");
    }
}

// ============================================================================
// Key Index & Seam
// ============================================================================

#[test]
fn seam_reproduces_first_key_exactly() {
    let position = Vec3::new(1.0, 2.0, 3.0);
    let rotation = Quat::from_rotation_x(FRAC_PI_6);
    let scale = Vec3::new(2.0, 0.5, 1.0);
    let skeleton = Skeleton::new("one", vec![bone(0, None, Mat4::IDENTITY)]).unwrap();
    let clip = AnimationClip::new(
        "seam",
        4.0,
        vec![
            AnimationChannel::new(0)
                .with_position_keys(vkeys(&[position, Vec3::ZERO, Vec3::ZERO]))
                .with_rotation_keys(qkeys(&[rotation, Quat::IDENTITY, Quat::IDENTITY]))
                .with_scale_keys(vkeys(&[scale, Vec3::ONE, Vec3::ONE])),
        ],
    );
    let eval = evaluator(skeleton, clip, AnimationSettings::default());
    let expected =
        Mat4::from_translation(position) * Mat4::from_quat(rotation) * Mat4::from_scale(scale);

    // Effective duration is 4.0 * 0.25; every whole second lands on the seam.
    assert!((eval.effective_duration() - 1.0).abs() < EPSILON);
    for t in [0.0, 1.0, 2.0, 10.0] {
        assert!(mat_approx(eval.evaluate(t).globals()[0], expected), "t = {t}");
    }
}

#[test]
fn key_index_spreads_reference_keys_over_duration() {
    let positions: Vec<Vec3> = (0..4).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect();
    let skeleton = Skeleton::new("one", vec![bone(0, None, Mat4::IDENTITY)]).unwrap();
    let clip = AnimationClip::new("walk", 4.0, vec![rigid_channel(0, &positions)]);
    let eval = evaluator(skeleton, clip, AnimationSettings::default());

    // 4 keys over an effective 1.0 s: one key every 0.25 s.
    let x_at = |t: f64| eval.evaluate(t).globals()[0].w_axis.x;
    assert!((x_at(0.0) - 0.0).abs() < EPSILON);
    assert!((x_at(0.24) - 0.0).abs() < EPSILON);
    assert!((x_at(0.5) - 2.0).abs() < EPSILON);
    assert!((x_at(0.99) - 3.0).abs() < EPSILON);
    assert!((x_at(1.5) - 2.0).abs() < EPSILON);
    assert!((eval.key_position(0.5) - 2.0).abs() < EPSILON);
}

#[test]
fn negative_time_wraps_into_range() {
    let positions: Vec<Vec3> = (0..4).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect();
    let skeleton = Skeleton::new("one", vec![bone(0, None, Mat4::IDENTITY)]).unwrap();
    let clip = AnimationClip::new("walk", 1.0, vec![rigid_channel(0, &positions)]);
    let eval = evaluator(skeleton, clip, unscaled());

    // -0.25 wraps to 0.75, i.e. key 3.
    let pose = eval.evaluate(-0.25);
    assert!((pose.globals()[0].w_axis.x - 3.0).abs() < EPSILON);
}

// ============================================================================
// Out-of-range Fallback
// ============================================================================

#[test]
fn short_sequences_fall_back_to_identity_zero_and_zero_scale() {
    let positions = [Vec3::ZERO, Vec3::X, Vec3::new(5.0, 6.0, 7.0), Vec3::Y];
    let skeleton = Skeleton::new("one", vec![bone(0, None, Mat4::from_scale(Vec3::splat(3.0)))])
        .unwrap();
    let clip = AnimationClip::new(
        "sparse",
        1.0,
        vec![
            AnimationChannel::new(0)
                .with_position_keys(vkeys(&positions))
                .with_rotation_keys(qkeys(&[Quat::from_rotation_z(1.0)]))
                .with_scale_keys(vkeys(&[Vec3::ONE])),
        ],
    );
    let eval = evaluator(skeleton, clip, unscaled());

    // Key 2: position present, rotation and scale missing.
    let g = eval.evaluate(0.5).globals()[0];
    assert!(g.x_axis.abs_diff_eq(glam::Vec4::ZERO, EPSILON));
    assert!(g.y_axis.abs_diff_eq(glam::Vec4::ZERO, EPSILON));
    assert!(g.z_axis.abs_diff_eq(glam::Vec4::ZERO, EPSILON));
    assert!(g.w_axis.abs_diff_eq(glam::Vec4::new(5.0, 6.0, 7.0, 1.0), EPSILON));
}

#[test]
fn channel_for_unknown_bone_is_ignored() {
    let skeleton = Skeleton::new("one", vec![bone(0, None, Mat4::IDENTITY)]).unwrap();
    let clip = AnimationClip::new(
        "stray",
        1.0,
        vec![rigid_channel(0, &[Vec3::Z]), rigid_channel(9, &[Vec3::X])],
    );
    let pose = evaluator(skeleton, clip, unscaled()).evaluate(0.0);
    assert_eq!(pose.globals().len(), 1);
    assert!(mat_approx(pose.globals()[0], Mat4::from_translation(Vec3::Z)));
}

// ============================================================================
// Interpolated Policy
// ============================================================================

fn interpolated() -> AnimationSettings {
    AnimationSettings {
        policy: SamplingPolicy::Interpolated,
        duration_scale: 1.0,
    }
}

#[test]
fn interpolated_blends_toward_next_key() {
    let skeleton = Skeleton::new("one", vec![bone(0, None, Mat4::IDENTITY)]).unwrap();
    let clip = AnimationClip::new(
        "slide",
        2.0,
        vec![
            AnimationChannel::new(0)
                .with_position_keys(vkeys(&[Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0)]))
                .with_rotation_keys(qkeys(&[Quat::IDENTITY, Quat::from_rotation_y(FRAC_PI_2)]))
                .with_scale_keys(vkeys(&[Vec3::ONE, Vec3::ONE])),
        ],
    );
    let eval = evaluator(skeleton, clip, interpolated());

    // 2 keys over 2 s: t = 0.5 is index 0.5, halfway to key 1.
    let g = eval.evaluate(0.5).globals()[0];
    let expected = Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0))
        * Mat4::from_quat(Quat::from_rotation_y(FRAC_PI_2 / 2.0));
    assert!(mat_approx(g, expected));
}

#[test]
fn interpolated_clamps_past_last_key() {
    let skeleton = Skeleton::new("one", vec![bone(0, None, Mat4::IDENTITY)]).unwrap();
    let clip = AnimationClip::new(
        "slide",
        2.0,
        vec![rigid_channel(0, &[Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0)])],
    );
    let eval = evaluator(skeleton, clip, interpolated());

    let g = eval.evaluate(1.5).globals()[0];
    assert!(mat_approx(g, Mat4::from_translation(Vec3::new(4.0, 0.0, 0.0))));
}

#[test]
fn stepped_ignores_fraction() {
    let skeleton = Skeleton::new("one", vec![bone(0, None, Mat4::IDENTITY)]).unwrap();
    let clip = AnimationClip::new(
        "slide",
        2.0,
        vec![rigid_channel(0, &[Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0)])],
    );
    let eval = evaluator(skeleton, clip, unscaled());
    assert!(mat_approx(eval.evaluate(0.9).globals()[0], Mat4::IDENTITY));
}

// ============================================================================
// Construction
// ============================================================================

fn single_bone() -> Arc<Skeleton> {
    Arc::new(Skeleton::new("one", vec![bone(0, None, Mat4::IDENTITY)]).unwrap())
}

#[test]
fn empty_clip_list_is_rejected() {
    let err = PoseEvaluator::new(single_bone(), &[], AnimationSettings::default()).unwrap_err();
    assert!(matches!(err, OrreryError::EmptyClipList));
}

#[test]
fn clip_index_out_of_range_is_rejected() {
    let clip = Arc::new(AnimationClip::new("a", 1.0, vec![rigid_channel(0, &[Vec3::ZERO])]));
    let err = PoseEvaluator::with_clip_index(single_bone(), &[clip], 3, unscaled()).unwrap_err();
    assert!(matches!(err, OrreryError::ClipIndexOutOfRange { index: 3, count: 1 }));
}

#[test]
fn zero_duration_is_rejected() {
    let clip = Arc::new(AnimationClip::new("flat", 0.0, vec![rigid_channel(0, &[Vec3::ZERO])]));
    let err = PoseEvaluator::new(single_bone(), &[clip], unscaled()).unwrap_err();
    assert!(matches!(err, OrreryError::DegenerateClipDuration { .. }));
}

#[test]
fn reference_channel_without_position_keys_is_rejected() {
    let clip = Arc::new(AnimationClip::new(
        "spin",
        1.0,
        vec![AnimationChannel::new(0).with_rotation_keys(qkeys(&[Quat::IDENTITY]))],
    ));
    let err = PoseEvaluator::new(single_bone(), &[clip], unscaled()).unwrap_err();
    assert!(matches!(err, OrreryError::MissingReferenceChannel(name) if name == "spin"));

    let empty = Arc::new(AnimationClip::new("empty", 1.0, Vec::new()));
    let err = PoseEvaluator::new(single_bone(), &[empty], unscaled()).unwrap_err();
    assert!(matches!(err, OrreryError::MissingReferenceChannel(_)));
}

#[test]
fn non_positive_duration_scale_is_rejected() {
    let clip = Arc::new(AnimationClip::new("a", 1.0, vec![rigid_channel(0, &[Vec3::ZERO])]));
    let settings = AnimationSettings {
        policy: SamplingPolicy::Stepped,
        duration_scale: 0.0,
    };
    let err = PoseEvaluator::new(single_bone(), &[clip], settings).unwrap_err();
    assert!(matches!(err, OrreryError::InvalidSettings(_)));
}

#[test]
fn clip_index_selects_active_clip() {
    let a = Arc::new(AnimationClip::new("a", 1.0, vec![rigid_channel(0, &[Vec3::X])]));
    let b = Arc::new(AnimationClip::new("b", 1.0, vec![rigid_channel(0, &[Vec3::Y])]));
    let eval = PoseEvaluator::with_clip_index(single_bone(), &[a, b], 1, unscaled()).unwrap();

    assert_eq!(eval.clip().name, "b");
    assert!(mat_approx(eval.evaluate(0.0).globals()[0], Mat4::from_translation(Vec3::Y)));
}

#[test]
fn evaluate_into_reuses_pose() {
    let clip = Arc::new(AnimationClip::new(
        "a",
        1.0,
        vec![rigid_channel(0, &[Vec3::X, Vec3::Y])],
    ));
    let eval = PoseEvaluator::new(single_bone(), &[clip], unscaled()).unwrap();

    let mut pose = eval.evaluate(0.0);
    eval.evaluate_into(0.75, &mut pose);
    assert!(mat_approx(pose.globals()[0], Mat4::from_translation(Vec3::Y)));
    assert_eq!(pose, eval.evaluate(0.75));
}
