//! # Model Provider Module / 模型提供者模块
//!
//! The narrow interface through which the engine reaches models. Loading,
//! serialization and the meaning of a "condition" or "design" belong to the
//! implementor; the engine only needs to ask for them by id.
//!
//! 引擎获取模型的窄接口。加载、序列化以及"条件"或"设计"的含义由实现者决定；
//! 引擎只需要按 id 请求它们。

use crate::core::error::ProviderError;

/// A solvable flux model as seen by test bodies.
pub trait FluxModel: Clone {
    /// Solves the model and returns the objective value.
    /// Returns `ProviderError::Infeasible` when no steady state exists.
    fn optimize(&mut self) -> Result<f64, ProviderError>;

    /// Flux through a reaction from the last solution, `None` if the reaction is unknown.
    fn reaction_flux(&self, reaction_id: &str) -> Option<f64>;
}

/// The project handle passed to every test body.
///
/// Every loader fails with [`ProviderError::NotFound`] on an unknown id.
pub trait ModelProvider {
    type Model: FluxModel;

    /// Loads a model by id, or the project's default model for `None`.
    fn load_model(&self, id: Option<&str>) -> Result<Self::Model, ProviderError>;

    /// Applies a named condition set to the model.
    fn load_conditions(&self, id: &str, model: Self::Model) -> Result<Self::Model, ProviderError>;

    /// Applies a named strain design to the model.
    fn load_design(&self, id: &str, model: Self::Model) -> Result<Self::Model, ProviderError>;

    fn list_models(&self) -> Vec<String>;

    fn list_conditions(&self) -> Vec<String>;

    fn list_designs(&self) -> Vec<String>;

    /// Whether growth is expected under a condition set.
    fn growth_expected(&self, _conditions_id: &str) -> bool {
        true
    }

    /// Models a condition set applies to; all models unless restricted.
    fn condition_models(&self, _conditions_id: &str) -> Vec<String> {
        self.list_models()
    }
}
