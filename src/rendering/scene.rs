//! シーングラフモジュール
//!
//! ノードの階層構造と、描画対象のノード集合（シーン）を管理します。
//! ノードは `Rc<RefCell<Node>>` で共有され、所有者とシーンの両方から参照されます。

use std::cell::RefCell;
use std::rc::Rc;

use glam::{Mat4, Quat, Vec3};

use super::mesh::Mesh;
use crate::physics::Ray;

/// 共有ノード
pub type NodeRef = Rc<RefCell<Node>>;

/// RGB色
pub type Color = [u8; 3];

/// オレンジ色（デフォルトの表示色）
pub const DEFAULT_COLOR: Color = [0xff, 0x8c, 0x1a];

/// シーングラフのノード
///
/// `clone` すると変換は独立したコピーになり、ジオメトリは共有されます。
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub visible: bool,
    pub color: Color,
    pub mesh: Option<Rc<Mesh>>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            visible: true,
            color: DEFAULT_COLOR,
            mesh: None,
            children: Vec::new(),
        }
    }

    /// メッシュを設定
    pub fn with_mesh(mut self, mesh: Rc<Mesh>) -> Self {
        self.mesh = Some(mesh);
        self
    }

    /// 子ノードを追加
    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// 色を設定
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// 共有ノードに変換
    pub fn into_ref(self) -> NodeRef {
        Rc::new(RefCell::new(self))
    }

    /// ローカル変換行列
    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// ローカルX軸まわりに回転
    pub fn rotate_x(&mut self, angle: f32) {
        self.rotation = (self.rotation * Quat::from_rotation_x(angle)).normalize();
    }

    /// ローカルY軸まわりに回転
    pub fn rotate_y(&mut self, angle: f32) {
        self.rotation = (self.rotation * Quat::from_rotation_y(angle)).normalize();
    }

    /// ローカルZ軸まわりに回転
    pub fn rotate_z(&mut self, angle: f32) {
        self.rotation = (self.rotation * Quat::from_rotation_z(angle)).normalize();
    }

    /// 表示中のメッシュをワールド行列と共に列挙（子ノードを含む）
    pub fn visit_meshes<F>(&self, parent: Mat4, visitor: &mut F)
    where
        F: FnMut(&Node, &Mesh, Mat4),
    {
        if !self.visible {
            return;
        }

        let world = parent * self.local_matrix();
        if let Some(mesh) = &self.mesh {
            visitor(self, mesh, world);
        }
        for child in &self.children {
            child.visit_meshes(world, visitor);
        }
    }

    /// レイとの交差判定（子ノードを再帰的に判定）
    ///
    /// 表示状態には関係なく判定し、最も近い交差点までのワールド距離を返します。
    pub fn intersect_ray(&self, ray: &Ray, parent: Mat4) -> Option<f32> {
        let world = parent * self.local_matrix();

        let own_hit = self.mesh.as_ref().and_then(|mesh| {
            // 縮退した行列では判定しない
            if world.determinant().abs() < f32::EPSILON {
                return None;
            }
            let local_ray = ray.transformed(&world.inverse());
            let t = mesh.intersect_ray(&local_ray)?;
            let hit_point = world.transform_point3(local_ray.point_at(t));
            Some(hit_point.distance(ray.origin))
        });

        self.children
            .iter()
            .filter_map(|child| child.intersect_ray(ray, world))
            .chain(own_hit)
            .min_by(|a, b| a.total_cmp(b))
    }
}

/// シーン
///
/// 描画対象となるトップレベルノードの集合です。
#[derive(Debug)]
pub struct Scene {
    nodes: Vec<NodeRef>,
    /// 背景色
    pub background: Color,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            background: [0, 0, 0],
        }
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// ノードを追加（既に含まれていれば何もしない）
    pub fn add(&mut self, node: &NodeRef) {
        if !self.contains(node) {
            self.nodes.push(Rc::clone(node));
        }
    }

    /// ノードを削除（含まれていなければ何もしない）
    pub fn remove(&mut self, node: &NodeRef) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|n| !Rc::ptr_eq(n, node));
        self.nodes.len() != before
    }

    /// ノードが含まれているか
    pub fn contains(&self, node: &NodeRef) -> bool {
        self.nodes.iter().any(|n| Rc::ptr_eq(n, node))
    }

    pub fn nodes(&self) -> &[NodeRef] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
