//! Model loading for the sentiment classifier
//!
//! Resolves a [`ModelSource`] to a ready [`SentimentModel`]. BERT checkpoints
//! are read from a directory holding `config.json`, `model.safetensors` and a
//! tokenizer (`tokenizer.json`, or `vocab.txt` for a WordPiece tokenizer),
//! downloading it from the HuggingFace Hub first when needed.

use crate::classifier::SentimentModel;
use crate::config::{ModelConfig, ModelSource};
use crate::models::LexiconSentimentModel;
use sentiscope_core::{Error, Result};
use std::sync::Arc;

#[cfg(feature = "ml-models")]
pub use bert_loading::{get_device, load_tokenizer, resolve_model_dir};

/// Load the model described by `config`.
///
/// Any failure here is fatal for the caller: there is no silent fallback
/// to another backend.
pub async fn load_model(config: &ModelConfig) -> Result<Arc<dyn SentimentModel>> {
    match &config.source {
        ModelSource::Lexicon => {
            tracing::info!("Using built-in lexicon sentiment model");
            let model = LexiconSentimentModel::new()?.with_max_length(config.max_length);
            Ok(Arc::new(model))
        }
        #[cfg(feature = "ml-models")]
        _ => {
            let config = config.clone();
            tokio::task::spawn_blocking(move || bert_loading::load_bert(&config))
                .await
                .map_err(|e| Error::internal(format!("Model loading task failed: {}", e)))?
        }
        #[cfg(not(feature = "ml-models"))]
        _ => Err(Error::model(
            "BERT models require the 'ml-models' feature; use the lexicon source instead",
        )),
    }
}

#[cfg(feature = "ml-models")]
mod bert_loading {
    use super::*;
    use crate::models::BertSentimentModel;
    use candle_core::{DType, Device};
    use candle_nn::{Linear, VarBuilder};
    use candle_transformers::models::bert::{BertModel, Config as BertConfig};
    use hf_hub::{api::sync::Api, Repo, RepoType};
    use sentiscope_core::NUM_CLASSES;
    use serde::de::DeserializeOwned;
    use serde::Deserialize;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

    /// Fields of `config.json` needed to size the pooler and head
    #[derive(Debug, Deserialize)]
    struct HeadConfig {
        hidden_size: usize,
        #[serde(default)]
        id2label: Option<HashMap<String, String>>,
    }

    pub(super) fn load_bert(config: &ModelConfig) -> Result<Arc<dyn SentimentModel>> {
        let model_dir = resolve_model_dir(&config.source)?;
        let name = match &config.source {
            ModelSource::HuggingFace { repo, .. } => repo.clone(),
            _ => model_dir.display().to_string(),
        };

        tracing::info!("Loading sentiment model '{}'", name);

        let device = get_device(&config.device)?;
        let config_path = model_dir.join("config.json");
        let bert_config: BertConfig = parse_json_config(&config_path)?;
        let head_config: HeadConfig = parse_json_config(&config_path)?;

        if let Some(id2label) = &head_config.id2label {
            if id2label.len() != NUM_CLASSES {
                return Err(Error::model(format!(
                    "Model '{}' has {} output labels, expected {}",
                    name,
                    id2label.len(),
                    NUM_CLASSES
                )));
            }
        }

        let tokenizer = load_tokenizer(&model_dir, config.max_length)?;
        let vb = load_var_builder(&model_dir, &device)?;
        let backbone = load_bert_backbone(&vb, &bert_config)?;
        let pooler = load_linear(
            &vb,
            &["bert.pooler.dense", "pooler.dense"],
            head_config.hidden_size,
            head_config.hidden_size,
        )?;
        let classifier = load_linear(&vb, &["classifier"], head_config.hidden_size, NUM_CLASSES)?;

        tracing::info!("Model '{}' ready on {:?}", name, device);

        Ok(Arc::new(BertSentimentModel::new(
            name,
            tokenizer,
            backbone,
            pooler,
            classifier,
            device,
            config.max_length,
        )))
    }

    /// Local directory holding the model files, downloading them if needed
    pub fn resolve_model_dir(source: &ModelSource) -> Result<PathBuf> {
        match source {
            ModelSource::Local { path } => {
                if !path.is_dir() {
                    return Err(Error::model(format!(
                        "Model directory does not exist: {}",
                        path.display()
                    )));
                }
                Ok(path.clone())
            }
            ModelSource::HuggingFace { repo, revision } => {
                download_from_huggingface(repo, revision)
            }
            ModelSource::Lexicon => Err(Error::model(
                "Lexicon source has no model directory",
            )),
        }
    }

    fn download_from_huggingface(repo: &str, revision: &str) -> Result<PathBuf> {
        tracing::info!("Fetching model {}@{} from HuggingFace", repo, revision);

        let api = Api::new()
            .map_err(|e| Error::model(format!("Failed to initialize HuggingFace API: {}", e)))?;
        let repo_obj = api.repo(Repo::with_revision(
            repo.to_string(),
            RepoType::Model,
            revision.to_string(),
        ));

        let config_path = repo_obj
            .get("config.json")
            .map_err(|e| Error::model(format!("Failed to download config.json: {}", e)))?;

        repo_obj.get("model.safetensors").map_err(|e| {
            Error::model(format!(
                "Failed to download model.safetensors from {}@{}: {}",
                repo, revision, e
            ))
        })?;

        let tokenizer_found = ["tokenizer.json", "vocab.txt"].iter().any(|file| {
            match repo_obj.get(file) {
                Ok(_) => {
                    tracing::debug!("Found tokenizer file: {}", file);
                    true
                }
                Err(e) => {
                    tracing::debug!("Tokenizer file {} unavailable: {}", file, e);
                    false
                }
            }
        });

        if !tokenizer_found {
            return Err(Error::model(format!(
                "No tokenizer found in {} (tried tokenizer.json, vocab.txt)",
                repo
            )));
        }

        let model_dir = config_path
            .parent()
            .ok_or_else(|| Error::model("Invalid HuggingFace cache path"))?;

        tracing::info!("Model available at: {}", model_dir.display());
        Ok(model_dir.to_path_buf())
    }

    /// Map a device name to a Candle device; unknown names fall back to CPU
    pub fn get_device(device: &str) -> Result<Device> {
        match device.to_lowercase().as_str() {
            "cuda" | "cuda:0" => Device::new_cuda(0)
                .map_err(|e| Error::model(format!("Failed to initialize CUDA: {}", e))),
            "mps" | "metal" => Device::new_metal(0)
                .map_err(|e| Error::model(format!("Failed to initialize Metal: {}", e))),
            "cpu" => Ok(Device::Cpu),
            other => {
                tracing::warn!("Unknown device '{}', using CPU", other);
                Ok(Device::Cpu)
            }
        }
    }

    fn parse_json_config<T: DeserializeOwned>(config_path: &Path) -> Result<T> {
        let config_str = std::fs::read_to_string(config_path).map_err(|e| {
            Error::model(format!(
                "Failed to read config {}: {}",
                config_path.display(),
                e
            ))
        })?;

        serde_json::from_str(&config_str).map_err(|e| {
            Error::model(format!(
                "Failed to parse config {}: {}",
                config_path.display(),
                e
            ))
        })
    }

    /// Load the tokenizer, truncating to `max_length` and padding batches
    /// to their longest sequence
    pub fn load_tokenizer(model_dir: &Path, max_length: usize) -> Result<Tokenizer> {
        let mut tokenizer = read_tokenizer(model_dir)?;

        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(|e| Error::model(format!("Failed to configure truncation: {}", e)))?;

        if tokenizer.get_padding().is_none() {
            let pad_token = "[PAD]".to_string();
            let pad_id = tokenizer.token_to_id(&pad_token).unwrap_or(0);
            tokenizer.with_padding(Some(PaddingParams {
                strategy: PaddingStrategy::BatchLongest,
                pad_id,
                pad_token,
                ..Default::default()
            }));
        }

        Ok(tokenizer)
    }

    fn read_tokenizer(model_dir: &Path) -> Result<Tokenizer> {
        let tokenizer_json = model_dir.join("tokenizer.json");
        if tokenizer_json.exists() {
            tracing::debug!("Loading tokenizer from tokenizer.json");
            return Tokenizer::from_file(&tokenizer_json)
                .map_err(|e| Error::model(format!("Failed to load tokenizer.json: {}", e)));
        }

        let vocab_path = model_dir.join("vocab.txt");
        if vocab_path.exists() {
            tracing::debug!("Building WordPiece tokenizer from vocab.txt");

            use tokenizers::models::wordpiece::WordPiece;
            use tokenizers::normalizers::BertNormalizer;
            use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
            use tokenizers::processors::bert::BertProcessing;

            let wordpiece = WordPiece::from_file(vocab_path.to_string_lossy().as_ref())
                .unk_token("[UNK]".to_string())
                .build()
                .map_err(|e| Error::model(format!("Failed to build WordPiece model: {}", e)))?;

            let mut tokenizer = Tokenizer::new(wordpiece);
            let special = |token: &str| {
                tokenizer
                    .token_to_id(token)
                    .map(|id| (token.to_string(), id))
                    .ok_or_else(|| Error::model(format!("vocab.txt has no {} token", token)))
            };
            let sep = special("[SEP]")?;
            let cls = special("[CLS]")?;

            tokenizer.with_normalizer(Some(BertNormalizer::default()));
            tokenizer.with_pre_tokenizer(Some(BertPreTokenizer));
            tokenizer.with_post_processor(Some(BertProcessing::new(sep, cls)));

            return Ok(tokenizer);
        }

        Err(Error::model(format!(
            "No tokenizer found in {} (tried tokenizer.json, vocab.txt)",
            model_dir.display()
        )))
    }

    fn load_var_builder(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
        let weights_path = model_dir.join("model.safetensors");
        if !weights_path.exists() {
            return Err(Error::model(format!(
                "model.safetensors not found in {}",
                model_dir.display()
            )));
        }

        // SAFETY: the weights file is memory-mapped read-only and not modified while loaded
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device)
                .map_err(|e| Error::model(format!("Failed to load weights: {}", e)))?
        };

        Ok(vb)
    }

    fn load_bert_backbone(vb: &VarBuilder, config: &BertConfig) -> Result<BertModel> {
        let mut errors = Vec::new();

        for prefix in ["bert", ""] {
            let vb_prefix = if prefix.is_empty() {
                vb.clone()
            } else {
                vb.pp(prefix)
            };

            match BertModel::load(vb_prefix, config) {
                Ok(model) => {
                    tracing::debug!("Loaded BERT backbone from '{}'", display_prefix(prefix));
                    return Ok(model);
                }
                Err(e) => errors.push(format!("{}: {}", display_prefix(prefix), e)),
            }
        }

        Err(Error::model(format!(
            "Failed to load BERT backbone with tried prefixes [{}]",
            errors.join(" | ")
        )))
    }

    fn load_linear(
        vb: &VarBuilder,
        prefixes: &[&str],
        in_dim: usize,
        out_dim: usize,
    ) -> Result<Linear> {
        let mut errors = Vec::new();

        for prefix in prefixes {
            match candle_nn::linear(in_dim, out_dim, vb.pp(prefix)) {
                Ok(linear) => {
                    tracing::debug!("Loaded {}x{} layer from '{}'", in_dim, out_dim, prefix);
                    return Ok(linear);
                }
                Err(e) => errors.push(format!("{}: {}", prefix, e)),
            }
        }

        Err(Error::model(format!(
            "Checkpoint is missing a trained {}x{} layer [{}]",
            in_dim,
            out_dim,
            errors.join(" | ")
        )))
    }

    fn display_prefix(prefix: &str) -> &str {
        if prefix.is_empty() {
            "<root>"
        } else {
            prefix
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::SentimentClassifier;
    use sentiscope_core::SentimentLabel;

    #[tokio::test]
    async fn test_load_lexicon_model() {
        let config = ModelConfig {
            source: ModelSource::Lexicon,
            max_length: 64,
            ..Default::default()
        };
        let model = load_model(&config).await.unwrap();
        assert_eq!(model.max_length(), 64);

        let classifier = SentimentClassifier::new(model);
        let result = classifier.classify(Some("I love this!")).await.unwrap();
        assert_eq!(result.label, SentimentLabel::Positive);
    }

    #[cfg(feature = "ml-models")]
    #[tokio::test]
    async fn test_missing_local_model_is_fatal() {
        let config = ModelConfig {
            source: ModelSource::Local {
                path: "/nonexistent/sentiment-model".into(),
            },
            ..Default::default()
        };
        let err = load_model(&config).await.err().unwrap();
        assert!(err.to_string().contains("does not exist"));
    }

    #[cfg(feature = "ml-models")]
    #[tokio::test]
    async fn test_incomplete_model_dir_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = ModelConfig {
            source: ModelSource::Local {
                path: dir.path().to_path_buf(),
            },
            ..Default::default()
        };
        let err = load_model(&config).await.err().unwrap();
        assert!(err.to_string().contains("config.json"));
    }

    #[cfg(feature = "ml-models")]
    #[test]
    fn test_get_device_cpu() {
        assert!(get_device("cpu").unwrap().is_cpu());
        assert!(get_device("tpu").unwrap().is_cpu());
    }

    #[cfg(feature = "ml-models")]
    #[test]
    fn test_vocab_tokenizer_truncates_and_pads() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("vocab.txt"),
            "[PAD]\n[UNK]\n[CLS]\n[SEP]\nhello\nworld\n",
        )
        .unwrap();

        let tokenizer = load_tokenizer(dir.path(), 4).unwrap();

        let long = tokenizer.encode("Hello world hello world hello", true).unwrap();
        assert_eq!(long.get_ids(), &[2, 4, 5, 3]);

        let batch = tokenizer.encode_batch(vec!["hello", "hello world"], true).unwrap();
        assert_eq!(batch[0].get_ids().len(), batch[1].get_ids().len());
        assert_eq!(batch[0].get_attention_mask(), &[1, 1, 1, 0]);
        assert_eq!(batch[0].get_ids()[3], 0);
    }
}
