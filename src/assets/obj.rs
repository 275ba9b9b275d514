//! Wavefront OBJ パーサー
//!
//! 頂点（`v`）と面（`f`）のみを読み取り、`o` / `g` のグループごとに子ノードを作ります。
//! 法線やテクスチャ座標、マテリアルは無視します。

use std::collections::HashMap;
use std::rc::Rc;

use glam::Vec3;

use crate::error::{Error, Result};
use crate::rendering::{Mesh, Node};

/// グループ指定より前の面が入るグループ名
const DEFAULT_GROUP: &str = "default";

struct Group {
    name: String,
    faces: Vec<[u32; 3]>,
}

/// OBJテキストをノードテンプレートに変換する
///
/// 多角形の面は扇形に三角形分割します。負のインデックスは末尾からの相対指定です。
pub fn parse_obj(name: &str, text: &str) -> Result<Node> {
    let mut positions: Vec<Vec3> = Vec::new();
    let mut groups = vec![Group {
        name: DEFAULT_GROUP.to_string(),
        faces: Vec::new(),
    }];

    for (index, raw) in text.lines().enumerate() {
        let line_number = index + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut parts = line.split_whitespace();
        let keyword = match parts.next() {
            Some(k) => k,
            None => continue,
        };

        match keyword {
            "v" => {
                let coords = parts
                    .take(3)
                    .map(|p| p.parse::<f32>())
                    .collect::<std::result::Result<Vec<f32>, _>>()
                    .map_err(|e| parse_error(line_number, format!("invalid vertex: {}", e)))?;
                if coords.len() < 3 {
                    return Err(parse_error(line_number, "vertex needs 3 coordinates"));
                }
                positions.push(Vec3::new(coords[0], coords[1], coords[2]));
            }
            "f" => {
                let corners = parts
                    .map(|p| resolve_index(p, positions.len(), line_number))
                    .collect::<Result<Vec<u32>>>()?;
                if corners.len() < 3 {
                    return Err(parse_error(line_number, "face needs at least 3 vertices"));
                }
                if let Some(group) = groups.last_mut() {
                    for i in 1..corners.len() - 1 {
                        group.faces.push([corners[0], corners[i], corners[i + 1]]);
                    }
                }
            }
            "o" | "g" => {
                let group_name = parts.collect::<Vec<_>>().join(" ");
                groups.push(Group {
                    name: if group_name.is_empty() {
                        DEFAULT_GROUP.to_string()
                    } else {
                        group_name
                    },
                    faces: Vec::new(),
                });
            }
            _ => {}
        }
    }

    let mut root = Node::new(name);
    for group in groups.into_iter().filter(|g| !g.faces.is_empty()) {
        let mesh = build_group_mesh(&positions, &group.faces);
        root.children.push(Node::new(&group.name).with_mesh(Rc::new(mesh)));
    }

    if root.children.is_empty() {
        return Err(parse_error(0, format!("'{}' contains no faces", name)));
    }

    log::debug!(
        "OBJ '{}' を解析: 頂点 {} / グループ {}",
        name,
        positions.len(),
        root.children.len()
    );

    Ok(root)
}

/// `v`, `v/vt`, `v//vn`, `v/vt/vn` 形式の頂点参照を 0 始まりのインデックスに変換
fn resolve_index(token: &str, vertex_count: usize, line: usize) -> Result<u32> {
    let position = token.split('/').next().unwrap_or("");
    let value: i64 = position
        .parse()
        .map_err(|_| parse_error(line, format!("invalid face index '{}'", token)))?;

    let count = vertex_count as i64;
    let resolved = match value {
        0 => return Err(parse_error(line, "face index 0 is not allowed")),
        v if v > 0 => v - 1,
        v => count + v,
    };

    if resolved < 0 || resolved >= count {
        return Err(parse_error(line, format!("face index {} out of range", value)));
    }
    Ok(resolved as u32)
}

/// グループが使う頂点だけを集めてメッシュにする
fn build_group_mesh(positions: &[Vec3], faces: &[[u32; 3]]) -> Mesh {
    let mut remap: HashMap<u32, u32> = HashMap::new();
    let mut local_positions = Vec::new();

    let indices = faces
        .iter()
        .map(|face| {
            face.map(|global| {
                *remap.entry(global).or_insert_with(|| {
                    local_positions.push(positions[global as usize]);
                    (local_positions.len() - 1) as u32
                })
            })
        })
        .collect();

    Mesh::new(local_positions, indices)
}

fn parse_error(line: usize, reason: impl Into<String>) -> Error {
    Error::ObjParse {
        line,
        reason: reason.into(),
    }
}
