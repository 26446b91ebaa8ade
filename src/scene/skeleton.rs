use glam::Mat4;
use serde::{Deserialize, Deserializer, Serialize};
use smallvec::SmallVec;

use crate::errors::{OrreryError, Result};

/// Bone identifier. Ids are dense: a skeleton of `n` bones uses `0..n`, and
/// the id doubles as the slot in the bone-matrix buffer.
pub type BoneId = usize;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bone {
    pub id: BoneId,
    #[serde(default)]
    pub name: String,
    /// `None` for roots. Model files may also spell a root as `-1`.
    #[serde(default, deserialize_with = "deserialize_parent")]
    pub parent: Option<BoneId>,
    /// Bind-pose transform relative to the parent bone.
    pub transform: Mat4,
    /// Inverse bind matrix: maps model space into this bone's space.
    pub offset: Mat4,
}

impl Bone {
    #[must_use]
    pub fn new(id: BoneId, parent: Option<BoneId>, transform: Mat4, offset: Mat4) -> Self {
        Self {
            id,
            name: String::new(),
            parent,
            transform,
            offset,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

fn deserialize_parent<'de, D>(deserializer: D) -> std::result::Result<Option<BoneId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<i64>::deserialize(deserializer)?;
    match raw {
        None | Some(-1) => Ok(None),
        Some(id) => BoneId::try_from(id)
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid parent bone id {id}"))),
    }
}

/// A validated bone hierarchy (tree or forest).
///
/// Bones are stored by id. Construction also fixes a parent-major evaluation
/// order: every parent precedes its children, roots keep their declaration
/// order and children are visited pre-order.
#[derive(Debug, Clone)]
pub struct Skeleton {
    pub name: String,

    // bones[i].id == i
    bones: Vec<Bone>,
    roots: Vec<BoneId>,
    children: Vec<SmallVec<[BoneId; 4]>>,
    order: Vec<BoneId>,
}

impl Skeleton {
    /// Validates `bones` and builds the evaluation order.
    ///
    /// Fails when an id is out of `0..bones.len()` or duplicated, a parent
    /// does not exist, or the parent links form a cycle.
    pub fn new(name: &str, bones: Vec<Bone>) -> Result<Self> {
        let count = bones.len();

        let mut slots: Vec<Option<Bone>> = vec![None; count];
        let mut declared = Vec::with_capacity(count);
        for bone in bones {
            let id = bone.id;
            if id >= count {
                return Err(OrreryError::InvalidSkeleton(format!(
                    "{name}: bone id {id} out of range for {count} bones"
                )));
            }
            if slots[id].is_some() {
                return Err(OrreryError::InvalidSkeleton(format!(
                    "{name}: duplicate bone id {id}"
                )));
            }
            declared.push(id);
            slots[id] = Some(bone);
        }
        // Ids are unique and in range, so every slot is filled.
        let bones: Vec<Bone> = slots.into_iter().flatten().collect();

        let mut roots = Vec::new();
        let mut children: Vec<SmallVec<[BoneId; 4]>> = vec![SmallVec::new(); count];
        for &id in &declared {
            match bones[id].parent {
                None => roots.push(id),
                Some(parent) if parent >= count => {
                    return Err(OrreryError::InvalidSkeleton(format!(
                        "{name}: bone {id} references missing parent {parent}"
                    )));
                }
                Some(parent) if parent == id => {
                    return Err(OrreryError::InvalidSkeleton(format!(
                        "{name}: bone {id} is its own parent"
                    )));
                }
                Some(parent) => children[parent].push(id),
            }
        }

        let order = parent_major_order(&roots, &children, count);
        if order.len() != count {
            return Err(OrreryError::InvalidSkeleton(format!(
                "{name}: bone hierarchy contains a cycle"
            )));
        }

        Ok(Self {
            name: name.to_string(),
            bones,
            roots,
            children,
            order,
        })
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// Bones indexed by id.
    #[inline]
    #[must_use]
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    #[inline]
    #[must_use]
    pub fn bone(&self, id: BoneId) -> Option<&Bone> {
        self.bones.get(id)
    }

    #[inline]
    #[must_use]
    pub fn roots(&self) -> &[BoneId] {
        &self.roots
    }

    #[must_use]
    pub fn children(&self, id: BoneId) -> &[BoneId] {
        self.children.get(id).map_or(&[][..], SmallVec::as_slice)
    }

    /// Ids in parent-major order.
    #[inline]
    #[must_use]
    pub fn evaluation_order(&self) -> &[BoneId] {
        &self.order
    }

    /// Bind-pose world transforms, indexed by id.
    #[must_use]
    pub fn bind_pose_globals(&self) -> Vec<Mat4> {
        let mut globals = vec![Mat4::IDENTITY; self.len()];
        for &id in &self.order {
            let bone = &self.bones[id];
            let parent = bone.parent.map_or(Mat4::IDENTITY, |p| globals[p]);
            globals[id] = parent * bone.transform;
        }
        globals
    }
}

/// Pre-order walk from each root with an explicit stack. Bones on a cycle are
/// unreachable from any root and so are missing from the result.
fn parent_major_order(
    roots: &[BoneId],
    children: &[SmallVec<[BoneId; 4]>],
    count: usize,
) -> Vec<BoneId> {
    let mut order = Vec::with_capacity(count);
    let mut stack: Vec<BoneId> = Vec::with_capacity(count);

    for &root in roots {
        stack.push(root);
        while let Some(id) = stack.pop() {
            order.push(id);
            // Reverse so the first declared child is visited first.
            stack.extend(children[id].iter().rev().copied());
        }
    }

    order
}
