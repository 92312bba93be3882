//! Staged async pipeline.
//!
//! Each stage runs as its own Tokio task, connected by bounded channels:
//!
//! ```text
//!                      ┌─► header chan ─► Classify ─► decision chan ─┐
//! input ─► Fan-out ────┤                                             ├─► Combiner ─► output
//!                      └─► data chan (chunk + budget permit) ────────┘
//! ```
//!
//! The fan-out forwards a chunk only after it holds a byte-budget permit and
//! a slot on both channels. The combiner releases the permit once the chunk
//! has been handed to the output channel, so a slow consumer stalls the
//! fan-out instead of growing memory.
//!
//! Empty chunks inside a frame carry no bytes and are folded into the next
//! chunk, so output chunk boundaries can differ from the input only there.
//! Empty final chunks are kept.
//!
//! Dropping (or [closing](PipelineInput::close)) the input shuts the stages
//! down in order once everything in flight has been delivered.
//!
//! # Example
//!
//! ```
//! use uoe_router::protocol::FrameBuilder;
//! use uoe_router::{Destination, Router};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> uoe_router::Result<()> {
//! let mut pipeline = Router::builder().max_chunk_len(64).spawn()?;
//!
//! let frame = FrameBuilder::new(0x0806).payload(vec![0u8; 28]).build();
//! pipeline.input().send_frame(&frame, 16).await?;
//!
//! let first = pipeline.recv().await.unwrap();
//! assert_eq!(first.destination, Some(Destination::Arp));
//!
//! let (rest, stats) = pipeline.finish().await?;
//! assert_eq!(rest.len(), 2);
//! assert_eq!(stats.frames_out, 1);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::backpressure::{BudgetPermit, BufferBudget};
use crate::classify::Classifier;
use crate::config::RouterConfig;
use crate::datapath::{Combiner, FanOut};
use crate::error::{Result, RouterError};
use crate::protocol::{split_into_chunks, Chunk, Destination, OutputChunk};
use crate::stats::{RouterStats, StatsSnapshot};

type DataItem = (Chunk, BudgetPermit);

/// Producer side of a running pipeline.
///
/// Chunks must be sent in transport order by a single producer.
#[derive(Debug)]
pub struct PipelineInput {
    tx: mpsc::Sender<Chunk>,
}

impl PipelineInput {
    /// Send one chunk, waiting while the pipeline is backpressured.
    pub async fn send(&self, chunk: Chunk) -> Result<()> {
        self.tx
            .send(chunk)
            .await
            .map_err(|_| RouterError::ChannelClosed)
    }

    /// Split `frame` into `chunk_len`-byte chunks and send them.
    pub async fn send_frame(&self, frame: &Bytes, chunk_len: usize) -> Result<()> {
        for chunk in split_into_chunks(frame, chunk_len) {
            self.send(chunk).await?;
        }
        Ok(())
    }

    /// True once the fan-out task has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Stop accepting input; in-flight chunks are still delivered.
    pub fn close(self) {}
}

/// Handles of the running stage tasks.
#[derive(Debug)]
pub struct PipelineTasks {
    stages: Vec<(&'static str, JoinHandle<Result<()>>)>,
    stats: Arc<RouterStats>,
}

impl PipelineTasks {
    /// Shared statistics.
    pub fn stats(&self) -> Arc<RouterStats> {
        self.stats.clone()
    }

    /// Wait for every stage to stop.
    ///
    /// Returns the first stage error, in pipeline order, or the final
    /// statistics.
    pub async fn join(self) -> Result<StatsSnapshot> {
        let mut first_error = None;
        for (name, handle) in self.stages {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(RouterError::TaskFailed(format!("{} stage: {}", name, e))),
            };
            if let Err(e) = result {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(self.stats.snapshot()),
        }
    }
}

/// A running staged pipeline.
#[derive(Debug)]
pub struct Pipeline {
    input: PipelineInput,
    output: mpsc::Receiver<OutputChunk>,
    tasks: PipelineTasks,
}

impl Pipeline {
    /// Validate `config` and spawn the stage tasks on the current runtime.
    ///
    /// Fails with `TaskFailed` when called outside a Tokio runtime.
    pub fn spawn(config: RouterConfig) -> Result<Self> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| RouterError::TaskFailed(e.to_string()))?;

        let capacity = config.channel_capacity;
        let (input_tx, input_rx) = mpsc::channel(capacity);
        let (header_tx, header_rx) = mpsc::channel(capacity);
        let (data_tx, data_rx) = mpsc::channel(capacity);
        let (decision_tx, decision_rx) = mpsc::channel(capacity);
        let (output_tx, output_rx) = mpsc::channel(capacity);

        let budget = BufferBudget::new(config.buffer_capacity_bytes);
        let stats = Arc::new(RouterStats::new());

        let fanout = FanOutStage {
            gate: FanOut::new(config.max_chunk_len),
            budget: budget.clone(),
            input: input_rx,
            header: header_tx,
            data: data_tx,
            stats: stats.clone(),
        };
        let classify = ClassifyStage {
            classifier: Classifier::new(),
            header: header_rx,
            decisions: decision_tx,
            stats: stats.clone(),
            log_decisions: config.log_decisions,
        };
        let combine = CombineStage {
            combiner: Combiner::new(),
            data: data_rx,
            decisions: decision_rx,
            output: output_tx,
            stats: stats.clone(),
        };

        let stages = vec![
            ("fan-out", runtime.spawn(fanout.run())),
            ("classify", runtime.spawn(classify.run())),
            ("combine", runtime.spawn(combine.run(budget))),
        ];
        tracing::debug!(
            "Pipeline started: buffer {} bytes, channels {} deep",
            config.buffer_capacity_bytes,
            capacity
        );

        Ok(Self {
            input: PipelineInput { tx: input_tx },
            output: output_rx,
            tasks: PipelineTasks { stages, stats },
        })
    }

    /// Producer handle.
    pub fn input(&self) -> &PipelineInput {
        &self.input
    }

    /// Send one chunk.
    pub async fn send(&self, chunk: Chunk) -> Result<()> {
        self.input.send(chunk).await
    }

    /// Receive the next tagged chunk; `None` once the pipeline has stopped.
    pub async fn recv(&mut self) -> Option<OutputChunk> {
        self.output.recv().await
    }

    /// Shared statistics.
    pub fn stats(&self) -> Arc<RouterStats> {
        self.tasks.stats()
    }

    /// Split into producer, consumer and task handles.
    pub fn into_parts(self) -> (PipelineInput, mpsc::Receiver<OutputChunk>, PipelineTasks) {
        (self.input, self.output, self.tasks)
    }

    /// Close the input, collect everything still in flight and join the stages.
    pub async fn finish(self) -> Result<(Vec<OutputChunk>, StatsSnapshot)> {
        let (input, mut output, tasks) = self.into_parts();
        input.close();

        let mut rest = Vec::new();
        while let Some(chunk) = output.recv().await {
            rest.push(chunk);
        }
        let stats = tasks.join().await?;
        Ok((rest, stats))
    }
}

struct FanOutStage {
    gate: FanOut,
    budget: BufferBudget,
    input: mpsc::Receiver<Chunk>,
    header: mpsc::Sender<Chunk>,
    data: mpsc::Sender<DataItem>,
    stats: Arc<RouterStats>,
}

impl FanOutStage {
    async fn run(mut self) -> Result<()> {
        while let Some(chunk) = self.input.recv().await {
            if let Err(e) = self.gate.check(&chunk) {
                tracing::error!("Fan-out rejected chunk: {}", e);
                return Err(e);
            }
            // Folded into the next chunk: an undecided frame must never hold
            // more data slots than it has header bytes.
            if chunk.is_empty() && !chunk.last {
                continue;
            }

            let permit = match self.budget.try_reserve(chunk.len()) {
                Some(permit) => permit,
                None => {
                    self.stats.record_backpressure();
                    match self.budget.reserve(chunk.len()).await {
                        Ok(permit) => permit,
                        // Combiner has stopped.
                        Err(RouterError::ChannelClosed) => break,
                        Err(e) => return Err(e),
                    }
                }
            };
            let (data_slot, header_slot) =
                match tokio::try_join!(self.data.reserve(), self.header.reserve()) {
                    Ok(slots) => slots,
                    Err(_) => break,
                };

            self.stats.record_input(&chunk);
            header_slot.send(chunk.clone());
            data_slot.send((chunk, permit));
        }
        tracing::debug!("Fan-out stage stopped");
        Ok(())
    }
}

struct ClassifyStage {
    classifier: Classifier,
    header: mpsc::Receiver<Chunk>,
    decisions: mpsc::Sender<Destination>,
    stats: Arc<RouterStats>,
    log_decisions: bool,
}

impl ClassifyStage {
    async fn run(mut self) -> Result<()> {
        while let Some(chunk) = self.header.recv().await {
            let Some(classified) = self.classifier.feed(&chunk) else {
                continue;
            };
            if self.log_decisions {
                tracing::debug!(
                    "Frame -> {} (ethertype {:#06x}, proto {}, port {}, {:?})",
                    classified.decision.destination,
                    classified.fields.ethertype,
                    classified.fields.ip_protocol,
                    classified.fields.dest_port,
                    classified.decision.verdict
                );
            }
            self.stats.record_decision(&classified);

            if self
                .decisions
                .send(classified.decision.destination)
                .await
                .is_err()
            {
                break;
            }
        }
        if self.classifier.extractor().offset() > 0 {
            tracing::warn!(
                "Input ended mid-frame after {} bytes",
                self.classifier.extractor().offset()
            );
        }
        tracing::debug!("Classify stage stopped");
        Ok(())
    }
}

struct CombineStage {
    combiner: Combiner,
    data: mpsc::Receiver<DataItem>,
    decisions: mpsc::Receiver<Destination>,
    output: mpsc::Sender<OutputChunk>,
    stats: Arc<RouterStats>,
}

impl CombineStage {
    async fn run(self, budget: BufferBudget) -> Result<()> {
        let result = self.combine().await;
        budget.close();
        tracing::debug!("Combine stage stopped");
        result
    }

    async fn combine(mut self) -> Result<()> {
        while let Some((mut chunk, permit)) = self.data.recv().await {
            let out = loop {
                match self.combiner.combine(chunk) {
                    Ok(out) => break out,
                    Err(refused) => chunk = refused,
                }
                match self.decisions.recv().await {
                    Some(destination) => self.combiner.push_decision(destination),
                    None => {
                        // Only a frame cut off by end of input has no decision.
                        tracing::warn!("Dropping unclassified partial frame");
                        return Ok(());
                    }
                }
            };

            self.stats.record_output(&out);
            self.output
                .send(out)
                .await
                .map_err(|_| RouterError::ChannelClosed)?;
            permit.release();
        }
        Ok(())
    }
}
