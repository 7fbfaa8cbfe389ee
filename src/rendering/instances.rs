use bytemuck::{Pod, Zeroable};
use glam::{IVec4, Mat4, Vec3, Vec4};

/// One distinct foliage mesh type. The geometry fields index into the shared
/// concatenated vertex/index buffers; `raw_offset .. raw_offset + raw_count`
/// is this mesh's slice of both the raw and the visible instance buffers.
#[derive(Debug, Clone)]
pub struct MeshDescriptor {
    pub name: String,
    pub index_count: u32,
    pub first_index: u32,
    pub base_vertex: u32,
    pub texture_layer: u32,
    pub raw_offset: u32,
    pub raw_count: u32,
}

impl MeshDescriptor {
    pub fn new(
        name: impl Into<String>,
        index_count: u32,
        first_index: u32,
        base_vertex: u32,
        texture_layer: u32,
    ) -> MeshDescriptor {
        MeshDescriptor {
            name: name.into(),
            index_count,
            first_index,
            base_vertex,
            texture_layer,
            raw_offset: 0,
            raw_count: 0,
        }
    }
}

/// Static per-instance attributes as laid out for the cull kernel
/// (must match `RawInstance` in foliage_cull.wgsl).
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct RawInstance {
    /// xyz = world position, w = texture layer.
    pub position: Vec4,
    /// x = owning mesh index, y = texture layer; z/w unused.
    pub indices: IVec4,
}

/// Compacted survivor record consumed by the foliage vertex shader.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct VisibleInstance {
    pub position: Vec4,
}

/// Matches wgpu's indexed indirect argument layout (five u32 words), so the
/// same buffer the kernel mutates is consumed verbatim as the indirect draw
/// source. `instance_count` is the only field the GPU ever changes.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawCommand {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub base_vertex: u32,
    pub base_instance: u32,
}

/// CPU-side image of the GPU instance store: mesh descriptors with their
/// assigned slices, the raw instance array grouped contiguously by mesh, and
/// the draw command template with all instance counts at zero.
pub struct InstanceTable {
    pub meshes: Vec<MeshDescriptor>,
    pub raw_instances: Vec<RawInstance>,
    pub draw_commands: Vec<DrawCommand>,
}

impl InstanceTable {
    /// Lays out the store: meshes in declaration order, each owning a
    /// contiguous slice starting at the running sum of earlier counts. A
    /// mesh with no samples keeps its (empty) slice so mesh indices stay
    /// stable.
    pub fn build(mut meshes: Vec<MeshDescriptor>, points_per_mesh: &[Vec<Vec3>]) -> InstanceTable {
        let mut raw_instances = Vec::new();
        let mut draw_commands = Vec::with_capacity(meshes.len());
        let mut base_instance = 0u32;

        for (mesh_index, mesh) in meshes.iter_mut().enumerate() {
            let points: &[Vec3] = points_per_mesh
                .get(mesh_index)
                .map(Vec::as_slice)
                .unwrap_or(&[]);

            mesh.raw_offset = base_instance;
            mesh.raw_count = points.len() as u32;

            raw_instances.extend(points.iter().map(|point| RawInstance {
                position: point.extend(mesh.texture_layer as f32),
                indices: IVec4::new(mesh_index as i32, mesh.texture_layer as i32, 0, 0),
            }));

            draw_commands.push(DrawCommand {
                index_count: mesh.index_count,
                instance_count: 0,
                first_index: mesh.first_index,
                base_vertex: mesh.base_vertex,
                base_instance,
            });

            base_instance += mesh.raw_count;
        }

        InstanceTable {
            meshes,
            raw_instances,
            draw_commands,
        }
    }

    pub fn total_instances(&self) -> u32 {
        self.raw_instances.len() as u32
    }
}

/// CPU mirror of the cull kernel's per-instance predicate: the instance
/// survives when its position (tested as a point, no bounding radius) lies
/// inside the clip volume and not strictly inside the erase sphere.
pub fn instance_survives(
    view_proj: Mat4,
    position: Vec3,
    agent_position: Vec3,
    erase_radius: f32,
) -> bool {
    let clip = view_proj * position.extend(1.0);
    let w = clip.w;
    let in_frustum = clip.x >= -w
        && clip.x <= w
        && clip.y >= -w
        && clip.y <= w
        && clip.z >= 0.0
        && clip.z <= w;

    in_frustum && position.distance_squared(agent_position) >= erase_radius * erase_radius
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::frustum::Frustum;
    use glam::vec3;

    fn mesh(name: &str, index_count: u32) -> MeshDescriptor {
        MeshDescriptor::new(name, index_count, 0, 0, 0)
    }

    fn grid_points(n: i32, spacing: f32) -> Vec<Vec3> {
        let mut points = Vec::new();
        for x in -n..=n {
            for z in -n..=n {
                points.push(vec3(x as f32 * spacing, 0.0, z as f32 * spacing));
            }
        }
        points
    }

    fn test_view_proj() -> Mat4 {
        let view = Mat4::look_at_rh(vec3(0.0, 8.0, 20.0), Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh(45f32.to_radians(), 1.6, 0.5, 120.0);
        proj * view
    }

    /// Sequential emulation of the kernel: visits raw instances in the given
    /// order, reserving slots through fetch-and-increment exactly like the
    /// GPU does, and records which raw index claimed each visible slot.
    fn simulate_dispatch(
        table: &InstanceTable,
        view_proj: Mat4,
        agent: Vec3,
        erase_radius: f32,
        order: impl Iterator<Item = usize>,
    ) -> (Vec<DrawCommand>, Vec<Option<u32>>) {
        let mut commands = table.draw_commands.clone();
        let mut visible: Vec<Option<u32>> = vec![None; table.raw_instances.len()];

        for i in order {
            let raw = table.raw_instances[i];
            let mesh_index = raw.indices.x as usize;
            if !instance_survives(view_proj, raw.position.truncate(), agent, erase_radius) {
                continue;
            }

            let command = &mut commands[mesh_index];
            let slot = command.instance_count;
            command.instance_count += 1;

            assert!(
                slot < table.meshes[mesh_index].raw_count,
                "slot reservation overflowed the mesh slice"
            );
            let target = (command.base_instance + slot) as usize;
            assert!(visible[target].is_none(), "slot claimed twice");
            visible[target] = Some(i as u32);
        }

        (commands, visible)
    }

    #[test]
    fn slices_are_disjoint_and_cover_total() {
        let table = InstanceTable::build(
            vec![mesh("grass", 12), mesh("bush01", 30), mesh("bush05", 18)],
            &[grid_points(2, 1.0), vec![], grid_points(1, 2.0)],
        );

        assert_eq!(table.meshes[0].raw_offset, 0);
        assert_eq!(table.meshes[0].raw_count, 25);
        assert_eq!(table.meshes[1].raw_offset, 25);
        assert_eq!(table.meshes[1].raw_count, 0);
        assert_eq!(table.meshes[2].raw_offset, 25);
        assert_eq!(table.meshes[2].raw_count, 9);
        assert_eq!(table.total_instances(), 34);

        // Disjointness plus exact coverage of [0, total)
        let mut covered = vec![false; table.total_instances() as usize];
        for mesh in &table.meshes {
            for i in mesh.raw_offset..mesh.raw_offset + mesh.raw_count {
                assert!(!covered[i as usize], "slices overlap at {i}");
                covered[i as usize] = true;
            }
        }
        assert!(covered.iter().all(|&c| c));
    }

    #[test]
    fn draw_commands_start_zeroed_with_matching_bases() {
        let table = InstanceTable::build(
            vec![mesh("grass", 12), mesh("bush01", 30)],
            &[grid_points(1, 1.0), grid_points(1, 1.0)],
        );

        for (mesh, command) in table.meshes.iter().zip(&table.draw_commands) {
            assert_eq!(command.instance_count, 0);
            assert_eq!(command.base_instance, mesh.raw_offset);
            assert_eq!(command.index_count, mesh.index_count);
        }
    }

    #[test]
    fn raw_records_carry_owning_mesh_and_layer() {
        let meshes = vec![
            MeshDescriptor::new("grass", 12, 0, 0, 0),
            MeshDescriptor::new("bush01", 30, 12, 100, 1),
        ];
        let table = InstanceTable::build(meshes, &[vec![vec3(1.0, 2.0, 3.0)], vec![Vec3::ZERO]]);

        assert_eq!(table.raw_instances[0].indices.x, 0);
        assert_eq!(table.raw_instances[0].position, Vec4::new(1.0, 2.0, 3.0, 0.0));
        assert_eq!(table.raw_instances[1].indices.x, 1);
        assert_eq!(table.raw_instances[1].position.w, 1.0);
    }

    #[test]
    fn empty_mesh_never_accumulates_instances() {
        let table = InstanceTable::build(
            vec![mesh("grass", 12), mesh("empty", 30)],
            &[grid_points(3, 2.0), vec![]],
        );

        let (commands, _) =
            simulate_dispatch(&table, test_view_proj(), Vec3::ZERO, 0.0, 0..table.raw_instances.len());
        assert_eq!(commands[1].instance_count, 0);
    }

    #[test]
    fn conservation_and_predicate_agreement() {
        let table = InstanceTable::build(
            vec![mesh("grass", 12), mesh("bush01", 30)],
            &[grid_points(6, 3.0), grid_points(4, 5.0)],
        );
        let view_proj = test_view_proj();
        let agent = vec3(2.0, 0.0, 1.0);
        let radius = 4.0;

        let (commands, visible) =
            simulate_dispatch(&table, view_proj, agent, radius, 0..table.raw_instances.len());

        let total: u32 = commands.iter().map(|c| c.instance_count).sum();
        assert!(total <= table.total_instances());
        assert!(total > 0, "scene setup should leave survivors");

        let frustum = Frustum::from_view_projection(view_proj);
        for raw_index in visible.iter().flatten() {
            let position = table.raw_instances[*raw_index as usize].position.truncate();
            assert!(frustum.contains_point(position));
            assert!(position.distance(agent) >= radius);
        }
    }

    #[test]
    fn erase_boundary_is_strict() {
        let table = InstanceTable::build(
            vec![mesh("grass", 12)],
            &[vec![vec3(2.9, 0.0, 0.0), vec3(3.1, 0.0, 0.0)]],
        );
        // Camera looking at the origin from a distance, both points well
        // inside the frustum; agent at the origin with radius 3.
        let view = Mat4::look_at_rh(vec3(0.0, 4.0, 18.0), Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh(60f32.to_radians(), 1.0, 0.5, 100.0);
        let view_proj = proj * view;

        let (commands, visible) =
            simulate_dispatch(&table, view_proj, Vec3::ZERO, 3.0, 0..2);

        assert_eq!(commands[0].instance_count, 1);
        assert_eq!(visible[0], Some(1), "only the instance at distance 3.1 survives");
    }

    #[test]
    fn growing_erase_radius_never_grows_counts() {
        let table = InstanceTable::build(
            vec![mesh("grass", 12), mesh("bush01", 30)],
            &[grid_points(6, 2.0), grid_points(3, 4.0)],
        );
        let view_proj = test_view_proj();
        let agent = vec3(1.0, 0.0, -2.0);

        let mut previous: Option<Vec<u32>> = None;
        for radius in [0.0, 2.0, 5.0, 9.0, 50.0] {
            let (commands, _) =
                simulate_dispatch(&table, view_proj, agent, radius, 0..table.raw_instances.len());
            let counts: Vec<u32> = commands.iter().map(|c| c.instance_count).collect();
            if let Some(previous) = &previous {
                for (now, before) in counts.iter().zip(previous) {
                    assert!(now <= before, "radius {radius} grew a mesh count");
                }
            }
            previous = Some(counts);
        }
    }

    #[test]
    fn surviving_set_is_independent_of_visit_order() {
        let table = InstanceTable::build(
            vec![mesh("grass", 12), mesh("bush01", 30)],
            &[grid_points(5, 2.5), grid_points(5, 3.5)],
        );
        let view_proj = test_view_proj();
        let agent = vec3(0.0, 0.0, 4.0);
        let total = table.raw_instances.len();

        let (commands_fwd, visible_fwd) =
            simulate_dispatch(&table, view_proj, agent, 6.0, 0..total);
        let (commands_rev, visible_rev) =
            simulate_dispatch(&table, view_proj, agent, 6.0, (0..total).rev());

        assert_eq!(commands_fwd, commands_rev);

        // Within a slice the packing order may differ, but the set of
        // surviving raw indices per mesh must not.
        for mesh in &table.meshes {
            let slice = mesh.raw_offset as usize..(mesh.raw_offset + mesh.raw_count) as usize;
            let mut fwd: Vec<u32> = visible_fwd[slice.clone()].iter().flatten().copied().collect();
            let mut rev: Vec<u32> = visible_rev[slice].iter().flatten().copied().collect();
            fwd.sort_unstable();
            rev.sort_unstable();
            assert_eq!(fwd, rev);
        }
    }
}
