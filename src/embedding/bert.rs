use candle::{DType, Device, Result, Tensor};
use candle_core as candle;
use candle_core::IndexOp;
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config};
use std::path::Path;
use std::sync::Arc;

fn read_config(model_dir: &Path) -> Result<Config> {
    let config_content = std::fs::read_to_string(model_dir.join("config.json"))?;
    serde_json::from_str(&config_content)
        .map_err(|e| candle::Error::Msg(format!("Failed to parse config: {}", e)))
}

fn var_builder(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let weights_path = model_dir.join("model.safetensors");
    // SAFETY: the weights file is opened read-only and is not modified while mapped.
    unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device) }
}

/// Tensor prefix of the encoder trunk: `bert`, `roberta`, or none for bare checkpoints.
fn trunk_prefix(vb: &VarBuilder) -> Option<&'static str> {
    ["bert", "roberta"]
        .into_iter()
        .find(|prefix| vb.contains_tensor(&format!("{prefix}.embeddings.word_embeddings.weight")))
}

fn trunk<'a>(vb: &VarBuilder<'a>) -> VarBuilder<'a> {
    match trunk_prefix(vb) {
        Some(prefix) => vb.pp(prefix),
        None => vb.clone(),
    }
}

/// Loads the encoder trunk regardless of the checkpoint's tensor prefix.
fn load_trunk(vb: &VarBuilder, config: &Config) -> Result<BertModel> {
    BertModel::load(trunk(vb), config)
}

/// Loads the `[CLS]` pooler (dense + tanh) when the checkpoint carries one.
fn load_pooler(vb: &VarBuilder, config: &Config) -> Result<Option<Linear>> {
    let pooler = trunk(vb).pp("pooler").pp("dense");
    if !pooler.contains_tensor("weight") {
        return Ok(None);
    }
    candle_nn::linear(config.hidden_size, config.hidden_size, pooler).map(Some)
}

struct BertForSequenceClassificationImpl {
    bert: BertModel,
    pooler: Option<Linear>,
    classifier: Linear,
}

fn pool(pooler: Option<&Linear>, cls_token: Tensor) -> Result<Tensor> {
    match pooler {
        Some(dense) => dense.forward(&cls_token)?.tanh(),
        None => Ok(cls_token),
    }
}

impl BertForSequenceClassificationImpl {
    fn forward(
        &self,
        input_ids: &Tensor,
        token_type_ids: &Tensor,
        attention_mask: Option<&Tensor>,
    ) -> Result<Tensor> {
        let output = self
            .bert
            .forward(input_ids, token_type_ids, attention_mask)?;
        let cls_token = output.i((.., 0, ..))?;
        let pooled = pool(self.pooler.as_ref(), cls_token)?;
        self.classifier.forward(&pooled)
    }
}

/// Cross-encoder head: `[CLS]` hidden state, pooled when the checkpoint has a pooler, through a
/// single-logit linear layer.
///
/// `forward` takes `[batch, seq]` inputs and returns `[batch, 1]` logits.
#[derive(Clone)]
pub struct BertClassifier(Arc<BertForSequenceClassificationImpl>);

impl BertClassifier {
    pub fn load<P: AsRef<Path>>(model_dir: P, device: &Device) -> Result<Self> {
        let model_dir = model_dir.as_ref();
        let config = read_config(model_dir)?;
        let vb = var_builder(model_dir, device)?;

        let bert = load_trunk(&vb, &config)?;
        let pooler = load_pooler(&vb, &config)?;
        let classifier = candle_nn::linear(config.hidden_size, 1, vb.pp("classifier"))?;

        Ok(Self(Arc::new(BertForSequenceClassificationImpl {
            bert,
            pooler,
            classifier,
        })))
    }

    pub fn forward(
        &self,
        input_ids: &Tensor,
        token_type_ids: &Tensor,
        attention_mask: Option<&Tensor>,
    ) -> Result<Tensor> {
        self.0.forward(input_ids, token_type_ids, attention_mask)
    }
}

/// Sentence encoder: mean of the last hidden layer over non-padding tokens.
#[derive(Clone)]
pub struct BertEncoder {
    model: Arc<BertModel>,
    hidden_size: usize,
}

impl BertEncoder {
    pub fn load<P: AsRef<Path>>(model_dir: P, device: &Device) -> Result<Self> {
        let model_dir = model_dir.as_ref();
        let config = read_config(model_dir)?;
        let vb = var_builder(model_dir, device)?;
        let model = load_trunk(&vb, &config)?;

        Ok(Self {
            model: Arc::new(model),
            hidden_size: config.hidden_size,
        })
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// Returns `[batch, hidden]` mean-pooled embeddings.
    pub fn forward(
        &self,
        input_ids: &Tensor,
        token_type_ids: &Tensor,
        attention_mask: &Tensor,
    ) -> Result<Tensor> {
        let hidden = self
            .model
            .forward(input_ids, token_type_ids, Some(attention_mask))?;

        let mask = attention_mask.to_dtype(DType::F32)?.unsqueeze(2)?;
        let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
        let counts = mask.sum(1)?.clamp(1e-9f32, f32::MAX)?;
        summed.broadcast_div(&counts)
    }
}
