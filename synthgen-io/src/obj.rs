//! OBJ format support

use crate::error::IoError;
use obj::{Obj, ObjData};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use synthgen_core::{Point3f, Result, TriangleMesh};
use tracing::debug;

/// Reads OBJ files into [`TriangleMesh`]es
pub struct ObjReader;

impl ObjReader {
    /// Read the whole file as one mesh. A file without faces becomes a polyline
    /// through its vertices.
    pub fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
        let data = Self::load(path.as_ref())?;
        Ok(merged_mesh(&data))
    }

    /// Read the named object (`o` statement) of a file
    pub fn read_object<P: AsRef<Path>>(path: P, name: &str) -> Result<TriangleMesh> {
        let path = path.as_ref();
        let data = Self::load(path)?;
        object_mesh(&data, name).ok_or_else(|| {
            IoError::ParseError {
                path: path.display().to_string(),
                message: format!("no object named '{}'", name),
            }
            .into()
        })
    }

    /// Read every object of a file, keyed by name
    pub fn read_objects<P: AsRef<Path>>(path: P) -> Result<HashMap<String, TriangleMesh>> {
        let data = Self::load(path.as_ref())?;
        Ok(data
            .objects
            .iter()
            .filter_map(|o| object_mesh(&data, &o.name).map(|mesh| (o.name.clone(), mesh)))
            .collect())
    }

    /// Parse OBJ text from any reader
    pub fn read_mesh_from<R: Read>(input: R) -> Result<TriangleMesh> {
        let data = ObjData::load_buf(input).map_err(|e| IoError::ParseError {
            path: "<reader>".to_string(),
            message: e.to_string(),
        })?;
        Ok(merged_mesh(&data))
    }

    fn load(path: &Path) -> Result<ObjData> {
        if !path.exists() {
            return Err(IoError::FileNotFound { path: path.display().to_string() }.into());
        }
        let obj = Obj::load(path).map_err(|e| IoError::ParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        debug!(
            path = %path.display(),
            vertices = obj.data.position.len(),
            objects = obj.data.objects.len(),
            "Loaded OBJ"
        );
        Ok(obj.data)
    }
}

fn to_point(p: &[f32; 3]) -> Point3f {
    Point3f::new(p[0], p[1], p[2])
}

fn merged_mesh(data: &ObjData) -> TriangleMesh {
    let vertices: Vec<Point3f> = data.position.iter().map(to_point).collect();
    let mut faces = Vec::new();
    for object in &data.objects {
        for group in &object.groups {
            for poly in &group.polys {
                fan(poly.0.iter().map(|t| t.0), &mut faces);
            }
        }
    }
    TriangleMesh::from_vertices_and_faces(vertices, faces)
}

/// Mesh holding only the vertices the object's faces use
fn object_mesh(data: &ObjData, name: &str) -> Option<TriangleMesh> {
    let object = data.objects.iter().find(|o| o.name == name)?;
    let mut remap: HashMap<usize, usize> = HashMap::new();
    let mut vertices = Vec::new();
    let mut faces = Vec::new();

    for group in &object.groups {
        for poly in &group.polys {
            let indices: Vec<usize> = poly
                .0
                .iter()
                .filter_map(|t| {
                    let position = data.position.get(t.0)?;
                    Some(*remap.entry(t.0).or_insert_with(|| {
                        vertices.push(to_point(position));
                        vertices.len() - 1
                    }))
                })
                .collect();
            fan(indices.into_iter(), &mut faces);
        }
    }
    Some(TriangleMesh::from_vertices_and_faces(vertices, faces))
}

/// Triangulate a convex polygon as a fan around its first corner
fn fan<I: Iterator<Item = usize>>(mut corners: I, faces: &mut Vec<[usize; 3]>) {
    let Some(first) = corners.next() else { return };
    let Some(mut previous) = corners.next() else { return };
    for corner in corners {
        faces.push([first, previous, corner]);
        previous = corner;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TWO_OBJECTS: &str = "\
o box_top
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
f 1 2 3 4
o marker
v 5 5 5
v 6 5 5
v 5 6 5
f 5 6 7
";

    fn write_obj(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_quad_is_fan_triangulated() {
        let mesh = ObjReader::read_mesh_from(TWO_OBJECTS.as_bytes()).unwrap();
        assert_eq!(mesh.vertex_count(), 7);
        assert_eq!(mesh.faces, vec![[0, 1, 2], [0, 2, 3], [4, 5, 6]]);
    }

    #[test]
    fn test_read_object_remaps_vertices() {
        let file = write_obj(TWO_OBJECTS);
        let marker = ObjReader::read_object(file.path(), "marker").unwrap();
        assert_eq!(marker.vertex_count(), 3);
        assert_eq!(marker.faces, vec![[0, 1, 2]]);
        assert_eq!(marker.vertices[0], Point3f::new(5.0, 5.0, 5.0));
    }

    #[test]
    fn test_read_objects_by_name() {
        let file = write_obj(TWO_OBJECTS);
        let objects = ObjReader::read_objects(file.path()).unwrap();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects["box_top"].face_count(), 2);
    }

    #[test]
    fn test_missing_object_and_file() {
        let file = write_obj(TWO_OBJECTS);
        assert!(ObjReader::read_object(file.path(), "ghost").is_err());
        assert!(ObjReader::read_mesh("/definitely/not/here.obj").is_err());
    }

    #[test]
    fn test_vertices_only_file_has_no_faces() {
        let mesh = ObjReader::read_mesh_from("v 0 0 0\nv 0 0 1\nv 0 1 1\n".as_bytes()).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert!(mesh.faces.is_empty());
    }
}
