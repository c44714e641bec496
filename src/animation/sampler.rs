use crate::errors::SceneError;
use crate::math::Transform;
use crate::scene::{Node, PoseProvider, SceneQuery, TimeSource, apply_export_scale};

/// Reads node transforms from the host at a given frame.
///
/// Nothing is cached: every call moves the host's time cursor and reads the
/// pose back, since the cursor is shared, mutable host state.
#[derive(Debug, Clone, Copy)]
pub struct PoseSampler {
    export_scale: f32,
}

impl Default for PoseSampler {
    fn default() -> Self {
        Self { export_scale: 1.0 }
    }
}

impl PoseSampler {
    #[must_use]
    pub fn new(export_scale: f32) -> Self {
        Self { export_scale }
    }

    /// Moves the host to `frame` and reads one node: world-space position
    /// and rotation, local scale.
    pub fn sample<H>(&self, host: &mut H, node: &Node, frame: u32) -> Result<Transform, SceneError>
    where
        H: SceneQuery + TimeSource,
    {
        host.set_current_time(frame)?;
        self.read(&*host, &node.kind)
    }

    /// Moves the host to `frame` once and reads every node into `out`, in
    /// node order.
    pub fn sample_frame<H>(
        &self,
        host: &mut H,
        nodes: &[Node],
        frame: u32,
        out: &mut Vec<Transform>,
    ) -> Result<(), SceneError>
    where
        H: SceneQuery + TimeSource,
    {
        host.set_current_time(frame)?;
        let scene: &dyn SceneQuery = &*host;
        out.clear();
        for node in nodes {
            out.push(self.read(scene, &node.kind)?);
        }
        Ok(())
    }

    /// Reads a pose at the host's current time.
    pub fn read(
        &self,
        scene: &dyn SceneQuery,
        provider: &dyn PoseProvider,
    ) -> Result<Transform, SceneError> {
        let transform = provider.current_transform(scene)?;
        Ok(apply_export_scale(transform, self.export_scale))
    }
}
