//! ONNX export of the scaler + classifier pipeline
//!
//! Every exported graph has the same interface regardless of the model family:
//!
//! * input `float_input`: float `[N, F]`, raw (unscaled) feature values in
//!   feature-list order
//! * output `label`: int64 `[N]`, predicted class (1 = fraud)
//! * output `probabilities`: float `[N, 2]`, columns are P(legit), P(fraud)

pub mod proto;

use std::fs;
use std::path::Path;

use prost::Message;

use self::proto::{
    data_type, AttributeProto, GraphProto, ModelProto, NodeProto, OperatorSetIdProto,
    StringStringEntryProto, TensorProto, ValueInfoProto, DOMAIN_ONNX, DOMAIN_ONNX_ML,
    IR_VERSION, OPSET_ONNX, OPSET_ONNX_ML,
};
use super::error::ExportError;
use crate::models::{
    CandidateKind, DecisionTree, FittedModel, GradientBoostingModel, LogisticModel,
    RandomForestModel, TreeNode,
};
use crate::pipeline::StandardScaler;

pub const INPUT_NAME: &str = "float_input";
pub const LABEL_OUTPUT: &str = "label";
pub const PROBABILITIES_OUTPUT: &str = "probabilities";

const SCALED_NAME: &str = "scaled_input";
const GRAPH_NAME: &str = "fraud_pipeline";
const PRODUCER_NAME: &str = "fraudtrain";

/// Descriptive properties stored in the model's `metadata_props`
#[derive(Debug, Clone, PartialEq)]
pub struct ModelMetadata {
    pub selected_model: CandidateKind,
    pub auc: f64,
    /// RFC 3339 timestamp of the training run
    pub trained_at: String,
}

impl ModelMetadata {
    pub fn now(selected_model: CandidateKind, auc: f64) -> Self {
        Self {
            selected_model,
            auc,
            trained_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Compose the scaler and the fitted classifier into one ONNX model
///
/// # Errors
/// Feature-count disagreement between the scaler, the model and
/// `feature_names`; non-finite parameters; an ensemble without trees.
pub fn build_pipeline_graph(
    model: &FittedModel,
    scaler: &StandardScaler,
    feature_names: &[String],
    metadata: &ModelMetadata,
) -> Result<ModelProto, ExportError> {
    let n_features = feature_names.len();
    if scaler.n_features() != n_features {
        return Err(ExportError::FeatureMismatch {
            component: "scaler",
            actual: scaler.n_features(),
            expected: n_features,
        });
    }
    if model.n_features() != n_features {
        return Err(ExportError::FeatureMismatch {
            component: "model",
            actual: model.n_features(),
            expected: n_features,
        });
    }

    let mut nodes = vec![scaler_node(scaler)?];
    let mut initializer = Vec::new();
    match model {
        FittedModel::Logistic(m) => nodes.push(linear_classifier_node(m)?),
        FittedModel::Forest(m) => nodes.push(forest_classifier_node(m)?),
        FittedModel::Boosting(m) => {
            nodes.extend(boosting_nodes(m)?);
            initializer.push(TensorProto {
                dims: vec![1],
                data_type: data_type::FLOAT,
                float_data: vec![1.0],
                name: "one".to_string(),
                ..Default::default()
            });
        }
    }

    let graph = GraphProto {
        node: nodes,
        name: GRAPH_NAME.to_string(),
        initializer,
        input: vec![ValueInfoProto::tensor(
            INPUT_NAME,
            data_type::FLOAT,
            &[Err("N"), Ok(n_features as i64)],
        )],
        output: vec![
            ValueInfoProto::tensor(LABEL_OUTPUT, data_type::INT64, &[Err("N")]),
            ValueInfoProto::tensor(PROBABILITIES_OUTPUT, data_type::FLOAT, &[Err("N"), Ok(2)]),
        ],
        ..Default::default()
    };

    Ok(ModelProto {
        ir_version: IR_VERSION,
        producer_name: PRODUCER_NAME.to_string(),
        producer_version: env!("CARGO_PKG_VERSION").to_string(),
        model_version: 1,
        doc_string: format!("Fraud classifier ({})", metadata.selected_model),
        graph: Some(graph),
        opset_import: vec![
            OperatorSetIdProto {
                domain: DOMAIN_ONNX.to_string(),
                version: OPSET_ONNX,
            },
            OperatorSetIdProto {
                domain: DOMAIN_ONNX_ML.to_string(),
                version: OPSET_ONNX_ML,
            },
        ],
        metadata_props: vec![
            entry("feature_names", feature_names.join(",")),
            entry("selected_model", metadata.selected_model.display_name().to_string()),
            entry("auc", format!("{:.6}", metadata.auc)),
            entry("trained_at", metadata.trained_at.clone()),
        ],
        ..Default::default()
    })
}

/// Build the graph and write its protobuf encoding to `path`
pub fn export_onnx(
    path: &Path,
    model: &FittedModel,
    scaler: &StandardScaler,
    feature_names: &[String],
    metadata: &ModelMetadata,
) -> Result<(), ExportError> {
    let onnx = build_pipeline_graph(model, scaler, feature_names, metadata)?;
    fs::write(path, onnx.encode_to_vec()).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Decode a previously exported model
pub fn load_onnx(path: &Path) -> Result<ModelProto, ExportError> {
    let bytes = fs::read(path).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(ModelProto::decode(bytes.as_slice())?)
}

fn entry(key: &str, value: String) -> StringStringEntryProto {
    StringStringEntryProto {
        key: key.to_string(),
        value,
    }
}

fn ml_node(name: &str, op_type: &str, input: &[&str], output: &[&str]) -> NodeProto {
    node(name, op_type, input, output, DOMAIN_ONNX_ML)
}

fn node(name: &str, op_type: &str, input: &[&str], output: &[&str], domain: &str) -> NodeProto {
    NodeProto {
        input: input.iter().map(|s| s.to_string()).collect(),
        output: output.iter().map(|s| s.to_string()).collect(),
        name: name.to_string(),
        op_type: op_type.to_string(),
        domain: domain.to_string(),
        ..Default::default()
    }
}

/// Narrow to f32, rejecting values that are (or become) non-finite
fn to_f32<I>(values: I, component: &'static str, parameter: &'static str) -> Result<Vec<f32>, ExportError>
where
    I: IntoIterator<Item = f64>,
{
    values
        .into_iter()
        .map(|v| {
            let narrowed = v as f32;
            if v.is_finite() && narrowed.is_finite() {
                Ok(narrowed)
            } else {
                Err(ExportError::NonFinite {
                    component,
                    parameter,
                })
            }
        })
        .collect()
}

/// `Scaler` computes `(x - offset) * scale`, so the stored deviation is inverted
fn scaler_node(scaler: &StandardScaler) -> Result<NodeProto, ExportError> {
    if scaler.scale.iter().any(|&s| s == 0.0) {
        return Err(ExportError::NonFinite {
            component: "scaler",
            parameter: "inverse scale",
        });
    }
    let offset = to_f32(scaler.mean.iter().copied(), "scaler", "mean")?;
    let scale = to_f32(scaler.scale.iter().map(|s| 1.0 / s), "scaler", "inverse scale")?;

    let mut n = ml_node("scaler", "Scaler", &[INPUT_NAME], &[SCALED_NAME]);
    n.attribute = vec![
        AttributeProto::floats("offset", offset),
        AttributeProto::floats("scale", scale),
    ];
    Ok(n)
}

/// Two-class linear model with scores `[-z, z]`; LOGISTIC maps them to `[1-p, p]`
fn linear_classifier_node(model: &LogisticModel) -> Result<NodeProto, ExportError> {
    const COMPONENT: &str = "Logistic Regression";

    let weights = to_f32(model.coefficients.iter().copied(), COMPONENT, "coefficient")?;
    let intercept = to_f32([model.intercept], COMPONENT, "intercept")?[0];

    let mut coefficients: Vec<f32> = weights.iter().map(|w| -w).collect();
    coefficients.extend(&weights);

    let mut n = ml_node(
        "linear_classifier",
        "LinearClassifier",
        &[SCALED_NAME],
        &[LABEL_OUTPUT, PROBABILITIES_OUTPUT],
    );
    n.attribute = vec![
        AttributeProto::floats("coefficients", coefficients),
        AttributeProto::floats("intercepts", vec![-intercept, intercept]),
        AttributeProto::ints("classlabels_ints", vec![0, 1]),
        AttributeProto::int("multi_class", 0),
        AttributeProto::string("post_transform", "LOGISTIC"),
    ];
    Ok(n)
}

/// Node and leaf tables shared by both tree-ensemble operators
#[derive(Debug, Default)]
struct FlatTrees {
    tree_ids: Vec<i64>,
    node_ids: Vec<i64>,
    feature_ids: Vec<i64>,
    modes: Vec<&'static str>,
    values: Vec<f32>,
    true_ids: Vec<i64>,
    false_ids: Vec<i64>,
    /// (tree id, node id, leaf value)
    leaves: Vec<(i64, i64, f64)>,
}

impl FlatTrees {
    fn node_attributes(&self) -> Vec<AttributeProto> {
        vec![
            AttributeProto::ints("nodes_treeids", self.tree_ids.clone()),
            AttributeProto::ints("nodes_nodeids", self.node_ids.clone()),
            AttributeProto::ints("nodes_featureids", self.feature_ids.clone()),
            AttributeProto::strings("nodes_modes", &self.modes),
            AttributeProto::floats("nodes_values", self.values.clone()),
            AttributeProto::ints("nodes_truenodeids", self.true_ids.clone()),
            AttributeProto::ints("nodes_falsenodeids", self.false_ids.clone()),
        ]
    }
}

/// Arena ids are kept as node ids; splits are `BRANCH_LT` since `x < threshold`
/// goes to the left child
fn flatten_trees(
    trees: &[DecisionTree],
    n_features: usize,
    component: &'static str,
) -> Result<FlatTrees, ExportError> {
    if trees.is_empty() {
        return Err(ExportError::EmptyEnsemble { model: component });
    }

    let mut flat = FlatTrees::default();
    for (tree_id, tree) in trees.iter().enumerate() {
        let tree_id = tree_id as i64;
        for (node_id, node) in tree.nodes.iter().enumerate() {
            let node_id = node_id as i64;
            flat.tree_ids.push(tree_id);
            flat.node_ids.push(node_id);

            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(ExportError::FeatureMismatch {
                            component,
                            actual: feature + 1,
                            expected: n_features,
                        });
                    }
                    flat.feature_ids.push(*feature as i64);
                    flat.modes.push("BRANCH_LT");
                    flat.values.push(to_f32([*threshold], component, "threshold")?[0]);
                    flat.true_ids.push(*left as i64);
                    flat.false_ids.push(*right as i64);
                }
                TreeNode::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(ExportError::NonFinite {
                            component,
                            parameter: "leaf value",
                        });
                    }
                    flat.feature_ids.push(0);
                    flat.modes.push("LEAF");
                    flat.values.push(0.0);
                    flat.true_ids.push(0);
                    flat.false_ids.push(0);
                    flat.leaves.push((tree_id, node_id, *value));
                }
            }
        }
    }
    Ok(flat)
}

/// Each leaf votes `(1-p)/T` for class 0 and `p/T` for class 1, so the summed
/// scores are the forest's averaged probabilities
fn forest_classifier_node(model: &RandomForestModel) -> Result<NodeProto, ExportError> {
    const COMPONENT: &str = "Random Forest";

    let flat = flatten_trees(&model.trees, model.n_features, COMPONENT)?;
    let n_trees = model.trees.len() as f64;

    let mut class_tree_ids = Vec::with_capacity(flat.leaves.len() * 2);
    let mut class_node_ids = Vec::with_capacity(flat.leaves.len() * 2);
    let mut class_ids = Vec::with_capacity(flat.leaves.len() * 2);
    let mut class_weights = Vec::with_capacity(flat.leaves.len() * 2);
    for &(tree_id, node_id, p) in &flat.leaves {
        for (class, weight) in [(0, (1.0 - p) / n_trees), (1, p / n_trees)] {
            class_tree_ids.push(tree_id);
            class_node_ids.push(node_id);
            class_ids.push(class);
            class_weights.push(weight as f32);
        }
    }

    let mut n = ml_node(
        "tree_ensemble_classifier",
        "TreeEnsembleClassifier",
        &[SCALED_NAME],
        &[LABEL_OUTPUT, PROBABILITIES_OUTPUT],
    );
    n.attribute = flat.node_attributes();
    n.attribute.extend([
        AttributeProto::ints("class_treeids", class_tree_ids),
        AttributeProto::ints("class_nodeids", class_node_ids),
        AttributeProto::ints("class_ids", class_ids),
        AttributeProto::floats("class_weights", class_weights),
        AttributeProto::ints("classlabels_int64s", vec![0, 1]),
        AttributeProto::string("post_transform", "NONE"),
    ]);
    Ok(n)
}

/// Raw margin from a regressor, then sigmoid and the two-column layout
fn boosting_nodes(model: &GradientBoostingModel) -> Result<Vec<NodeProto>, ExportError> {
    const COMPONENT: &str = "Gradient Boosting";

    let flat = flatten_trees(&model.trees, model.n_features, COMPONENT)?;
    let base = to_f32([model.init_raw], COMPONENT, "initial score")?[0];
    let weights = to_f32(
        flat.leaves.iter().map(|&(_, _, v)| v * model.learning_rate),
        COMPONENT,
        "leaf weight",
    )?;

    let mut regressor = ml_node(
        "tree_ensemble_regressor",
        "TreeEnsembleRegressor",
        &[SCALED_NAME],
        &["margin"],
    );
    regressor.attribute = flat.node_attributes();
    regressor.attribute.extend([
        AttributeProto::ints("target_treeids", flat.leaves.iter().map(|l| l.0).collect()),
        AttributeProto::ints("target_nodeids", flat.leaves.iter().map(|l| l.1).collect()),
        AttributeProto::ints("target_ids", vec![0; flat.leaves.len()]),
        AttributeProto::floats("target_weights", weights),
        AttributeProto::floats("base_values", vec![base]),
        AttributeProto::int("n_targets", 1),
        AttributeProto::string("aggregate_function", "SUM"),
        AttributeProto::string("post_transform", "NONE"),
    ]);

    let sigmoid = node("sigmoid", "Sigmoid", &["margin"], &["p_fraud"], DOMAIN_ONNX);
    let complement = node("complement", "Sub", &["one", "p_fraud"], &["p_legit"], DOMAIN_ONNX);

    let mut concat = node(
        "concat",
        "Concat",
        &["p_legit", "p_fraud"],
        &[PROBABILITIES_OUTPUT],
        DOMAIN_ONNX,
    );
    concat.attribute = vec![AttributeProto::int("axis", 1)];

    let mut argmax = node(
        "argmax",
        "ArgMax",
        &[PROBABILITIES_OUTPUT],
        &[LABEL_OUTPUT],
        DOMAIN_ONNX,
    );
    argmax.attribute = vec![
        AttributeProto::int("axis", 1),
        AttributeProto::int("keepdims", 0),
    ];

    Ok(vec![regressor, sigmoid, complement, concat, argmax])
}
