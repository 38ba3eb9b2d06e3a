use std::time::Instant;

use crate::mesh::Mesh;
use crate::raster::RasterStats;

/// Wall-clock seconds since the viewer started, used to drive the model
/// rotation.
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    start: Instant,
}

impl FrameClock {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn seconds(&self) -> f32 {
        self.start.elapsed().as_secs_f32()
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::start()
    }
}

pub fn print_mesh_summary(mesh: &Mesh) {
    println!(
        "Loaded mesh with {} vertices ({} triangles)",
        mesh.vertices.len(),
        mesh.triangle_count()
    );
}

pub fn print_raster_summary(width: u32, height: u32, stats: &RasterStats) {
    println!(
        "Rendered {width}x{height} frame: {} triangles, {} discarded, {} fragments",
        stats.triangles, stats.discarded, stats.fragments
    );
}
