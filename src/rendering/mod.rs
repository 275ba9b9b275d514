//! レンダリングシステムモジュール
//!
//! シーングラフ、メッシュ、カメラと、Canvas 2D への描画を担当します。
//! 描画はフラットシェーディングの三角形を奥から順に塗るだけの簡易なものです。

mod camera;
mod mesh;
mod scene;

pub use camera::*;
pub use mesh::*;
pub use scene::*;

use glam::{Mat4, Vec2, Vec3};
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::error::{Error, Result};

/// シーンを描画するレンダラー
pub trait SceneRenderer {
    /// 現在のシーンを1フレーム描画
    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<()>;
}

/// 光源の向き（正規化前）
const LIGHT_DIRECTION: Vec3 = Vec3::new(-0.5, 1.0, 0.4);
/// 環境光の強さ
const AMBIENT: f32 = 0.35;

/// スクリーン空間の三角形
#[derive(Debug, Clone, PartialEq)]
pub struct DrawTriangle {
    pub points: [Vec2; 3],
    /// NDCの深度（大きいほど奥）
    pub depth: f32,
    pub color: Color,
}

/// シーンをスクリーン空間の三角形リストに変換する（奥から手前の順）
///
/// 近平面より手前や遠平面より奥にはみ出した三角形は捨てます。
pub fn build_draw_list(scene: &Scene, camera: &PerspectiveCamera, width: f32, height: f32) -> Vec<DrawTriangle> {
    let view_projection = camera.view_projection();
    let light = LIGHT_DIRECTION.normalize();
    let mut triangles = Vec::new();

    for node in scene.nodes() {
        node.borrow().visit_meshes(Mat4::IDENTITY, &mut |owner, mesh, world| {
            for tri in mesh.triangles() {
                let corners = [
                    world.transform_point3(tri.v0),
                    world.transform_point3(tri.v1),
                    world.transform_point3(tri.v2),
                ];

                let mut points = [Vec2::ZERO; 3];
                let mut depth = 0.0;
                let mut clipped = false;
                for (i, corner) in corners.iter().enumerate() {
                    let clip = view_projection * corner.extend(1.0);
                    if clip.w <= 0.0 {
                        clipped = true;
                        break;
                    }
                    let ndc = clip.truncate() / clip.w;
                    if !(-1.0..=1.0).contains(&ndc.z) {
                        clipped = true;
                        break;
                    }
                    points[i] = Vec2::new((ndc.x + 1.0) * 0.5 * width, (1.0 - ndc.y) * 0.5 * height);
                    depth += ndc.z / 3.0;
                }
                if clipped {
                    continue;
                }

                let normal = (corners[1] - corners[0]).cross(corners[2] - corners[0]).normalize_or_zero();
                let intensity = AMBIENT + (1.0 - AMBIENT) * normal.dot(light).abs();
                triangles.push(DrawTriangle {
                    points,
                    depth,
                    color: shade(owner.color, intensity),
                });
            }
        });
    }

    triangles.sort_by(|a, b| b.depth.total_cmp(&a.depth));
    triangles
}

fn shade(color: Color, intensity: f32) -> Color {
    let scale = |c: u8| (c as f32 * intensity).round().clamp(0.0, 255.0) as u8;
    [scale(color[0]), scale(color[1]), scale(color[2])]
}

fn css_color(color: Color) -> String {
    format!("#{:02x}{:02x}{:02x}", color[0], color[1], color[2])
}

/// Canvas 2D レンダラー
pub struct CanvasRenderer {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
}

impl CanvasRenderer {
    /// キャンバスIDからレンダラーを作成
    pub fn new(canvas_id: &str) -> Result<CanvasRenderer> {
        let document = web_sys::window()
            .ok_or_else(|| Error::Js("Failed to get window".to_string()))?
            .document()
            .ok_or_else(|| Error::Js("Failed to get document".to_string()))?;

        let canvas = document
            .get_element_by_id(canvas_id)
            .ok_or_else(|| Error::Js(format!("canvas '{}' not found", canvas_id)))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| Error::Js(format!("element '{}' is not a canvas", canvas_id)))?;

        let context = canvas
            .get_context("2d")
            .map_err(Error::js)?
            .ok_or_else(|| Error::Js("Failed to get 2d context".to_string()))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| Error::Js("Failed to get 2d context".to_string()))?;

        log::info!("🖌️ レンダラー初期化: {}x{}", canvas.width(), canvas.height());

        Ok(CanvasRenderer { canvas, context })
    }

    /// キャンバスのサイズを取得
    pub fn size(&self) -> (f64, f64) {
        (self.canvas.width() as f64, self.canvas.height() as f64)
    }

    fn size_px(&self) -> (i32, i32) {
        (self.canvas.width() as i32, self.canvas.height() as i32)
    }

    /// キャンバスのサイズを設定
    pub fn set_size(&mut self, width: f64, height: f64) {
        self.canvas.set_width(width as u32);
        self.canvas.set_height(height as u32);
    }
}

impl SceneRenderer for CanvasRenderer {
    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<()> {
        // 表示サイズが変わっていれば描画バッファを合わせる
        let (client_width, client_height) = (self.canvas.client_width(), self.canvas.client_height());
        if client_width > 0 && client_height > 0 && (client_width, client_height) != self.size_px() {
            self.set_size(client_width as f64, client_height as f64);
        }
        let (width, height) = self.size();

        self.context.set_fill_style_str(&css_color(scene.background));
        self.context.fill_rect(0.0, 0.0, width, height);

        for tri in build_draw_list(scene, camera, width as f32, height as f32) {
            let fill = css_color(tri.color);
            self.context.set_fill_style_str(&fill);
            self.context.set_stroke_style_str(&fill);
            self.context.begin_path();
            self.context.move_to(tri.points[0].x as f64, tri.points[0].y as f64);
            self.context.line_to(tri.points[1].x as f64, tri.points[1].y as f64);
            self.context.line_to(tri.points[2].x as f64, tri.points[2].y as f64);
            self.context.close_path();
            self.context.fill();
            // 隣接三角形の隙間を埋める
            self.context.stroke();
        }

        Ok(())
    }
}


#[cfg(all(test, target_arch = "wasm32"))]
mod browser_tests {
    use super::*;
    use crate::config::CameraConfig;
    use std::rc::Rc;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_canvas_renderer_draws_scene() {
        // テスト用のキャンバスを作成
        let document = web_sys::window().unwrap().document().unwrap();
        let canvas = document.create_element("canvas").unwrap();
        canvas.set_id("test_canvas");
        document.body().unwrap().append_child(&canvas).unwrap();

        let mut renderer = CanvasRenderer::new("test_canvas").unwrap();
        renderer.set_size(320.0, 240.0);

        let mut scene = Scene::new();
        let mut ball = Node::new("ball").with_mesh(Rc::new(Mesh::sphere(2.0, 12, 12)));
        ball.position.y = 25.0;
        scene.add(&ball.into_ref());

        let camera = PerspectiveCamera::from_config(&CameraConfig::default(), 320.0 / 240.0);
        assert!(renderer.render(&scene, &camera).is_ok());

        // クリーンアップ
        document.body().unwrap().remove_child(&canvas).unwrap();
    }

    #[wasm_bindgen_test]
    fn test_missing_canvas_is_error() {
        assert!(CanvasRenderer::new("no_such_canvas").is_err());
    }
}
