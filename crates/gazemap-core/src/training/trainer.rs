//! Epoch-driven train/validate loop.

use std::path::PathBuf;

use anyhow::{Context, Result};
use candle_core::{Device, Tensor, Var, D};
use candle_nn::ops::softmax;
use candle_nn::{AdamW, Optimizer, ParamsAdamW, VarMap, SGD};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing::{debug, info};

use super::schedule::ExponentialDecay;
use crate::domain::{
    Metric, Sample, Split, TrainingHistory, CHANNELS, EMBED_DIM, INPUT_SIZE, MAP_LEN,
};
use crate::metrics::MetricSet;
use crate::models::{KlDivergence, SaliencyModel};
use crate::ports::{ProgressEvent, ProgressSink, SampleSource};

/// Optimizer selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptimizerKind {
    /// Adam (AdamW with zero weight decay).
    #[default]
    Adam,
    /// AdamW with its default decoupled weight decay.
    AdamW,
    /// Plain stochastic gradient descent.
    Sgd,
}

/// Options for a training run.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    /// Number of epochs to run.
    pub epochs: usize,
    /// Batch size.
    pub batch_size: usize,
    /// Initial learning rate.
    pub lr: f64,
    /// Optimizer selection.
    pub optimizer: OptimizerKind,
    /// Optional per-step learning-rate decay.
    pub schedule: Option<ExponentialDecay>,
    /// Optional L1 regularization strength.
    pub l1: Option<f64>,
    /// Optional L2 regularization strength.
    pub l2: Option<f64>,
    /// Seed for batch shuffling.
    pub shuffle_seed: u64,
    /// When set, the variable map is checkpointed here after every epoch.
    pub checkpoint: Option<PathBuf>,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            epochs: 24,
            batch_size: 32,
            lr: 1e-4,
            optimizer: OptimizerKind::Adam,
            schedule: None,
            l1: None,
            l2: None,
            shuffle_seed: 0,
            checkpoint: None,
        }
    }
}

/// Candle's optimizers are distinct types; this wraps the selected one.
enum OptimizerState {
    AdamW(AdamW),
    Sgd(SGD),
}

impl OptimizerState {
    fn new(kind: OptimizerKind, vars: Vec<Var>, lr: f64) -> Result<Self> {
        Ok(match kind {
            OptimizerKind::Adam => Self::AdamW(AdamW::new(
                vars,
                ParamsAdamW {
                    lr,
                    weight_decay: 0.0,
                    ..ParamsAdamW::default()
                },
            )?),
            OptimizerKind::AdamW => Self::AdamW(AdamW::new(
                vars,
                ParamsAdamW {
                    lr,
                    ..ParamsAdamW::default()
                },
            )?),
            OptimizerKind::Sgd => Self::Sgd(SGD::new(vars, lr)?),
        })
    }

    fn backward_step(&mut self, loss: &Tensor) -> candle_core::Result<()> {
        match self {
            Self::AdamW(opt) => opt.backward_step(loss),
            Self::Sgd(opt) => opt.backward_step(loss),
        }
    }

    fn set_learning_rate(&mut self, lr: f64) {
        match self {
            Self::AdamW(opt) => opt.set_learning_rate(lr),
            Self::Sgd(opt) => opt.set_learning_rate(lr),
        }
    }
}

/// Aggregated scalars for one pass over a split.
struct EpochStats {
    loss: f64,
    metrics: MetricSums,
}

/// Running per-sample metric sums.
#[derive(Default)]
struct MetricSums {
    auc: f64,
    cc: f64,
    nss: f64,
    kldiv: f64,
    sim: f64,
    count: usize,
}

impl MetricSums {
    fn add(&mut self, set: &MetricSet) {
        self.auc += set.auc;
        self.cc += set.cc;
        self.nss += set.nss;
        self.kldiv += set.kldiv;
        self.sim += set.sim;
        self.count += 1;
    }

    #[allow(clippy::cast_precision_loss)]
    fn mean(&self, sum: f64) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            sum / self.count as f64
        }
    }
}

/// Runs the epoch loop over a sample store.
pub struct Trainer {
    device: Device,
    options: TrainOptions,
    loss_fn: KlDivergence,
}

impl Trainer {
    /// Creates a trainer for the given device and options.
    #[must_use]
    pub fn new(device: Device, options: TrainOptions) -> Self {
        Self {
            device,
            options,
            loss_fn: KlDivergence,
        }
    }

    /// Runs the configured number of epochs.
    ///
    /// With a `train` source, every epoch performs a gradient pass over it
    /// followed by a metric-only pass over `val`; without one the run is
    /// validate-only. Per-epoch scalars are appended to `history`; when a
    /// checkpoint path is configured the variable map is saved after each
    /// epoch.
    ///
    /// # Errors
    ///
    /// Returns an error on any tensor, I/O, or store failure.
    pub fn fit(
        &self,
        model: &dyn SaliencyModel,
        varmap: &VarMap,
        trainable: Vec<Var>,
        train: Option<&dyn SampleSource>,
        val: &dyn SampleSource,
        history: &mut TrainingHistory,
        progress: &dyn ProgressSink,
    ) -> Result<()> {
        let mut optimizer = match train {
            Some(_) => Some(OptimizerState::new(
                self.options.optimizer,
                trainable.clone(),
                self.options.lr,
            )?),
            None => None,
        };
        let mut rng = ChaCha20Rng::seed_from_u64(self.options.shuffle_seed);
        let mut step = 0usize;

        for epoch in 0..self.options.epochs {
            if let (Some(train_src), Some(opt)) = (train, optimizer.as_mut()) {
                let stats = self.run_epoch(
                    model,
                    train_src,
                    Some((opt, &trainable, &mut step)),
                    &mut rng,
                )?;
                self.record(history, Split::Train, &stats);
                progress.on_event(ProgressEvent::EpochFinished {
                    epoch,
                    split: Split::Train,
                    loss: stats.loss,
                });
                info!("epoch {epoch}: train loss {:.5}", stats.loss);
            }

            let stats = self.run_epoch(model, val, None, &mut rng)?;
            self.record(history, Split::Val, &stats);
            progress.on_event(ProgressEvent::EpochFinished {
                epoch,
                split: Split::Val,
                loss: stats.loss,
            });
            info!("epoch {epoch}: val loss {:.5}", stats.loss);

            if let Some(path) = &self.options.checkpoint {
                varmap
                    .save(path)
                    .with_context(|| format!("Failed to save checkpoint: {}", path.display()))?;
                debug!("Checkpoint written to {}", path.display());
            }
        }

        Ok(())
    }

    /// One pass over a split. A `Some` third argument makes it a training
    /// pass (shuffled batches, gradient updates); `None` is metrics-only.
    fn run_epoch(
        &self,
        model: &dyn SaliencyModel,
        source: &dyn SampleSource,
        mut updater: Option<(&mut OptimizerState, &Vec<Var>, &mut usize)>,
        rng: &mut ChaCha20Rng,
    ) -> Result<EpochStats> {
        let mut indices: Vec<usize> = (0..source.len()).collect();
        if updater.is_some() {
            indices.shuffle(rng);
        }

        let mut loss_sum = 0.0f64;
        let mut batches = 0usize;
        let mut sums = MetricSums::default();

        for chunk in indices.chunks(self.options.batch_size.max(1)) {
            let samples: Vec<Sample> = chunk
                .iter()
                .map(|&i| source.get(i))
                .collect::<Result<_>>()?;
            let (images, captions, targets) = self.batch_tensors(&samples, model)?;

            let predicted = model.predict(&images, captions.as_ref())?;
            let mut loss = self.loss_fn.forward(&predicted, &targets)?;

            if let Some((opt, vars, step)) = updater.as_mut() {
                if let Some(reg) = self.regularization(vars.as_slice())? {
                    loss = (loss + reg)?;
                }
                if let Some(schedule) = &self.options.schedule {
                    opt.set_learning_rate(schedule.lr_at(self.options.lr, **step));
                }
                opt.backward_step(&loss)?;
                **step += 1;
            }

            loss_sum += f64::from(loss.to_vec0::<f32>()?);
            batches += 1;
            self.accumulate_metrics(&predicted, &samples, &mut sums)?;
        }

        #[allow(clippy::cast_precision_loss)]
        let loss = if batches == 0 {
            0.0
        } else {
            loss_sum / batches as f64
        };
        Ok(EpochStats {
            loss,
            metrics: sums,
        })
    }

    /// Assembles the batch tensors for a slice of samples.
    fn batch_tensors(
        &self,
        samples: &[Sample],
        model: &dyn SaliencyModel,
    ) -> Result<(Tensor, Option<Tensor>, Tensor)> {
        let batch = samples.len();

        let mut image_buf = Vec::with_capacity(batch * samples[0].image.len());
        let mut target_buf = Vec::with_capacity(batch * MAP_LEN);
        for sample in samples {
            image_buf.extend_from_slice(&sample.image);
            target_buf.extend_from_slice(&sample.saliency);
        }
        let images = Tensor::from_vec(
            image_buf,
            (batch, CHANNELS, INPUT_SIZE, INPUT_SIZE),
            &self.device,
        )?;
        let targets = Tensor::from_vec(target_buf, (batch, INPUT_SIZE, INPUT_SIZE), &self.device)?;

        let captions = if model.uses_captions() {
            let mut caption_buf = Vec::with_capacity(batch * EMBED_DIM);
            for sample in samples {
                caption_buf.extend_from_slice(&sample.caption);
            }
            Some(Tensor::from_vec(
                caption_buf,
                (batch, EMBED_DIM),
                &self.device,
            )?)
        } else {
            None
        };

        Ok((images, captions, targets))
    }

    /// Optional L1/L2 penalty over the trainable variables.
    fn regularization(&self, vars: &[Var]) -> Result<Option<Tensor>> {
        let mut penalty: Option<Tensor> = None;
        for var in vars {
            let tensor = var.as_tensor();
            if let Some(l1) = self.options.l1 {
                let term = (tensor.abs()?.sum_all()? * l1)?;
                penalty = Some(match penalty {
                    Some(p) => (p + term)?,
                    None => term,
                });
            }
            if let Some(l2) = self.options.l2 {
                let term = (tensor.sqr()?.sum_all()? * l2)?;
                penalty = Some(match penalty {
                    Some(p) => (p + term)?,
                    None => term,
                });
            }
        }
        Ok(penalty)
    }

    /// Computes per-sample metrics from the spatially softmaxed prediction.
    fn accumulate_metrics(
        &self,
        predicted: &Tensor,
        samples: &[Sample],
        sums: &mut MetricSums,
    ) -> Result<()> {
        let batch = samples.len();
        let flat = predicted.reshape((batch, MAP_LEN))?;
        let probs = softmax(&flat, D::Minus1)?.to_vec2::<f32>()?;
        for (row, sample) in probs.iter().zip(samples) {
            sums.add(&MetricSet::compute(row, &sample.saliency));
        }
        Ok(())
    }

    /// Appends one epoch's scalars to the history.
    fn record(&self, history: &mut TrainingHistory, split: Split, stats: &EpochStats) {
        let m = &stats.metrics;
        history.record(split, Metric::Loss, stats.loss);
        history.record(split, Metric::Auc, m.mean(m.auc));
        history.record(split, Metric::Cc, m.mean(m.cc));
        history.record(split, Metric::Nss, m.mean(m.nss));
        history.record(split, Metric::KlDiv, m.mean(m.kldiv));
        history.record(split, Metric::Sim, m.mean(m.sim));
    }
}
