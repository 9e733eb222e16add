//! # Test Expansion Planner Module / 测试展开计划模块
//!
//! Expands each [`TestDefinition`] across its [`ParameterSelector`] into a
//! group of addressed cases, creating the paired result records as it goes.
//! Wildcards are resolved here, against whatever the provider knows now.
//!
//! 将每个 [`TestDefinition`] 按其 [`ParameterSelector`] 展开为一组带地址的用例，
//! 同时创建与之配对的结果记录。通配符在此处根据提供者当前已知的内容解析。

use crate::core::config::{ParamList, ParameterSelector};
use crate::core::error::RecordError;
use crate::core::execution::{
    declarative_body, default_design_body, default_model_body, CaseInstance, CaseOrigin,
    GroupInstance, TestInstance,
};
use crate::core::loader::{DefinitionKind, TestDefinition};
use crate::core::models::{join_address, tags, ParamTuple, ResultRecord};
use crate::core::provider::ModelProvider;

/// Id of the group holding the built-in checks.
pub const DEFAULT_TESTS_GROUP: &str = "default_tests";

/// Resolves one selector axis.
///
/// An empty list becomes `[None]`. A wildcard becomes every known id followed,
/// when `implicit_none` is set, by `None`.
pub fn resolve_axis(
    list: &ParamList,
    known: impl FnOnce() -> Vec<String>,
    implicit_none: bool,
) -> Vec<Option<String>> {
    let resolved: Vec<Option<String>> = match list {
        ParamList::Default => vec![None],
        ParamList::Ids(ids) => ids.iter().cloned().map(Some).collect(),
        ParamList::All => {
            let mut ids: Vec<Option<String>> = known().into_iter().map(Some).collect();
            if implicit_none {
                ids.push(None);
            }
            ids
        }
    };

    if resolved.is_empty() {
        vec![None]
    } else {
        resolved
    }
}

/// Cartesian product of models x conditions x designs, in that order, without repeats.
pub fn expand_selector<P: ModelProvider>(
    selector: &ParameterSelector,
    provider: &P,
) -> Vec<ParamTuple> {
    let models = resolve_axis(&selector.models, || provider.list_models(), false);
    let conditions = resolve_axis(&selector.conditions, || provider.list_conditions(), true);
    let designs = resolve_axis(&selector.designs, || provider.list_designs(), true);

    let mut tuples: Vec<ParamTuple> = Vec::with_capacity(models.len() * conditions.len() * designs.len());
    for model in &models {
        for conditions_id in &conditions {
            for design in &designs {
                let tuple = ParamTuple::new(model.clone(), conditions_id.clone(), design.clone());
                if !tuples.contains(&tuple) {
                    tuples.push(tuple);
                }
            }
        }
    }
    tuples
}

/// Builds the group for one definition under `parent`, one case per parameter tuple.
pub fn plan_definition<P: ModelProvider>(
    definition: &TestDefinition<P>,
    provider: &P,
    parent: &mut ResultRecord,
) -> Result<GroupInstance<P>, RecordError> {
    let group_id = definition.id();
    let group_record = parent.create_child(group_id.clone(), false)?;
    let mut group = GroupInstance::new(group_id.clone());

    let body = match &definition.kind {
        DefinitionKind::Declarative(spec) => declarative_body::<P>(spec.clone()),
        DefinitionKind::Script(body) => body.clone(),
    };
    let origin = CaseOrigin {
        source_name: definition.group.clone(),
        name: definition.name.clone(),
    };

    for params in expand_selector(&definition.selector, provider) {
        let case_id = params.address(&group_id);
        if group_record.child(&case_id).is_some() {
            group_record.add_error(address_taken(&case_id, &params), tags::ADDRESS_COLLISION);
            continue;
        }
        group_record.create_child(case_id.clone(), true)?;
        group.push(TestInstance::Case(CaseInstance::new(
            case_id,
            params,
            origin.clone(),
            body.clone(),
        )));
    }

    Ok(group)
}

/// Two tuples can share an address once their `None` segments are dropped,
/// e.g. a condition set and a design with the same id. Only the first gets a case.
fn address_taken(case_id: &str, params: &ParamTuple) -> String {
    format!("case {params} skipped: address {case_id} already belongs to another case")
}

/// Builds the group of built-in checks: every model solves, every condition set
/// behaves as the provider expects, every design solves on the default model.
pub fn plan_default_tests<P: ModelProvider>(
    provider: &P,
    parent: &mut ResultRecord,
) -> Result<GroupInstance<P>, RecordError> {
    let group_record = parent.create_child(DEFAULT_TESTS_GROUP, false)?;
    let mut group = GroupInstance::new(DEFAULT_TESTS_GROUP);

    let mut add_case = |name: String, params: ParamTuple, body| -> Result<(), RecordError> {
        let case_id = join_address([DEFAULT_TESTS_GROUP, name.as_str()]);
        if group_record.child(&case_id).is_some() {
            group_record.add_error(address_taken(&case_id, &params), tags::ADDRESS_COLLISION);
            return Ok(());
        }
        group_record.create_child(case_id.clone(), true)?;
        let origin = CaseOrigin {
            source_name: DEFAULT_TESTS_GROUP.to_string(),
            name,
        };
        group.push(TestInstance::Case(CaseInstance::new(case_id, params, origin, body)));
        Ok(())
    };

    for model_id in provider.list_models() {
        add_case(
            format!("model_{model_id}"),
            ParamTuple::new(Some(model_id), None, None),
            default_model_body::<P>(true),
        )?;
    }

    for conditions_id in provider.list_conditions() {
        let expected = provider.growth_expected(&conditions_id);
        for model_id in provider.condition_models(&conditions_id) {
            add_case(
                format!("conditions_{conditions_id}:model_{model_id}"),
                ParamTuple::new(Some(model_id), Some(conditions_id.clone()), None),
                default_model_body::<P>(expected),
            )?;
        }
    }

    for design_id in provider.list_designs() {
        add_case(
            format!("design_{design_id}"),
            ParamTuple::new(None, None, Some(design_id)),
            default_design_body::<P>(),
        )?;
    }

    Ok(group)
}
