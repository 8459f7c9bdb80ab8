use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;
use volkit_core::measure::Mesh;

/// Write a mesh as Wavefront OBJ.
///
/// Vertices are emitted as `x y z` (column, row, plane). Swapping the axis
/// order mirrors the mesh, so faces are written with reversed winding to
/// keep normals pointing outward.
pub fn write_obj<P: AsRef<Path>>(path: P, mesh: &Mesh) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("Failed to create OBJ file {}", path.display()))?;
    let mut out = BufWriter::new(file);
    write_obj_to(&mut out, mesh).with_context(|| format!("Failed to write OBJ file {}", path.display()))?;
    out.flush()?;
    info!(
        path = %path.display(),
        vertices = mesh.vertices.len(),
        faces = mesh.faces.len(),
        "wrote OBJ mesh"
    );
    Ok(())
}

fn write_obj_to<W: Write>(out: &mut W, mesh: &Mesh) -> std::io::Result<()> {
    writeln!(out, "# volkit surface")?;
    for v in &mesh.vertices {
        writeln!(out, "v {} {} {}", v[2], v[1], v[0])?;
    }
    for f in &mesh.faces {
        writeln!(out, "f {} {} {}", f[0] + 1, f[2] + 1, f[1] + 1)?;
    }
    Ok(())
}
