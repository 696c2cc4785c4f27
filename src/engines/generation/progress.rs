use crate::types::GenerationRecord;
use std::sync::mpsc::Sender;

pub trait ProgressCallback: Send {
    fn on_generation_start(&mut self, generation: usize);
    fn on_generation_complete(&mut self, record: &GenerationRecord);
    fn on_organism_evaluated(&mut self, evaluated: usize, total: usize);
}

pub struct ConsoleProgressCallback;

impl ProgressCallback for ConsoleProgressCallback {
    fn on_generation_start(&mut self, generation: usize) {
        log::debug!("Generation {} starting...", generation);
    }

    fn on_generation_complete(&mut self, record: &GenerationRecord) {
        log::info!(
            "Generation {} complete. Best fitness: {:.6}, average: {:.6}",
            record.generation,
            record.best_fitness,
            record.average_fitness
        );
    }

    fn on_organism_evaluated(&mut self, evaluated: usize, total: usize) {
        if evaluated % 10 == 0 || evaluated == total {
            log::debug!("  Evaluated {}/{} organisms", evaluated, total);
        }
    }
}

/// Progress forwarded over a channel, for callers running the loop on
/// another thread
pub struct ChannelProgressCallback {
    sender: Sender<ProgressMessage>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressMessage {
    GenerationStart(usize),
    GenerationComplete(GenerationRecord),
    OrganismEvaluated { current: usize, total: usize },
}

impl ChannelProgressCallback {
    pub fn new(sender: Sender<ProgressMessage>) -> Self {
        Self { sender }
    }
}

impl ProgressCallback for ChannelProgressCallback {
    fn on_generation_start(&mut self, generation: usize) {
        let _ = self.sender.send(ProgressMessage::GenerationStart(generation));
    }

    fn on_generation_complete(&mut self, record: &GenerationRecord) {
        let _ = self.sender.send(ProgressMessage::GenerationComplete(*record));
    }

    fn on_organism_evaluated(&mut self, evaluated: usize, total: usize) {
        let _ = self.sender.send(ProgressMessage::OrganismEvaluated {
            current: evaluated,
            total,
        });
    }
}
