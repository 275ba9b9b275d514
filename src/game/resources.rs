//! ゲームリソース管理モジュール
//!
//! 落下オブジェクト1つ分の表示ノードを、登録済みのテンプレートから作成します。

use std::rc::Rc;

use crate::assets::AssetRegistry;
use crate::config::AssetConfig;
use crate::error::Result;
use crate::rendering::{Mesh, Node, NodeRef};

/// コライダー球の分割数
const COLLIDER_SEGMENTS: u32 = 12;

/// 落下オブジェクトの表示ノード一式
pub struct FruitVisuals {
    pub whole: NodeRef,
    pub top: NodeRef,
    pub bottom: NodeRef,
    /// 不可視の球コライダー
    pub collider: Option<NodeRef>,
}

impl FruitVisuals {
    /// テンプレートを複製して表示ノードを作成
    ///
    /// 3つのテンプレートがすべて揃っていなければ `ModelNotLoaded` を返し、何も作りません。
    pub fn instantiate(registry: &AssetRegistry, assets: &AssetConfig, collider_radius: Option<f32>) -> Result<Self> {
        let whole = registry.require(&assets.whole.name)?;
        let top = registry.require(&assets.top.name)?;
        let bottom = registry.require(&assets.bottom.name)?;

        let collider = collider_radius.map(|radius| {
            let mut node = Node::new("collider").with_mesh(Rc::new(Mesh::sphere(
                radius,
                COLLIDER_SEGMENTS,
                COLLIDER_SEGMENTS,
            )));
            node.visible = false;
            node.into_ref()
        });

        Ok(Self {
            whole: whole.clone().into_ref(),
            top: top.clone().into_ref(),
            bottom: bottom.clone().into_ref(),
            collider,
        })
    }

    /// すべての表示ノード（コライダーを含む）
    pub fn all(&self) -> impl Iterator<Item = &NodeRef> + '_ {
        [&self.whole, &self.top, &self.bottom]
            .into_iter()
            .chain(self.collider.as_ref())
    }

    /// 回転するモデル（コライダーを除く）
    pub fn models(&self) -> [&NodeRef; 3] {
        [&self.whole, &self.top, &self.bottom]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn registry_with(names: &[&str]) -> AssetRegistry {
        let mut registry = AssetRegistry::new();
        for name in names {
            registry.insert(name, Node::new(name).with_mesh(Rc::new(Mesh::sphere(1.0, 6, 6))));
        }
        registry
    }

    #[test]
    fn test_instantiate_clones_templates() {
        let registry = registry_with(&["orange", "orangeTop", "orangeBottom"]);
        let visuals = FruitVisuals::instantiate(&registry, &AssetConfig::default(), None).unwrap();

        visuals.whole.borrow_mut().position.x = 3.0;
        assert_eq!(registry.get("orange").unwrap().position.x, 0.0);
        assert_eq!(visuals.all().count(), 3);
    }

    #[test]
    fn test_missing_template_reports_name() {
        let registry = registry_with(&["orange", "orangeBottom"]);
        let result = FruitVisuals::instantiate(&registry, &AssetConfig::default(), None);
        assert!(matches!(result, Err(Error::ModelNotLoaded { name }) if name == "orangeTop"));
    }

    #[test]
    fn test_collider_is_invisible() {
        let registry = registry_with(&["orange", "orangeTop", "orangeBottom"]);
        let visuals = FruitVisuals::instantiate(&registry, &AssetConfig::default(), Some(2.0)).unwrap();

        let collider = visuals.collider.as_ref().unwrap();
        assert!(!collider.borrow().visible);
        assert_eq!(visuals.all().count(), 4);
    }
}
