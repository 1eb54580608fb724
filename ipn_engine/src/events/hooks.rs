use std::{future::Future, pin::Pin, sync::Arc};

use super::{EventHandler, EventProducer, Handler, PurchaseCompletedEvent, ReversalRecordedEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub purchase_completed_producer: Vec<EventProducer<PurchaseCompletedEvent>>,
    pub reversal_recorded_producer: Vec<EventProducer<ReversalRecordedEvent>>,
}

pub struct EventHandlers {
    pub on_purchase_completed: Option<EventHandler<PurchaseCompletedEvent>>,
    pub on_reversal_recorded: Option<EventHandler<ReversalRecordedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_purchase_completed = hooks.on_purchase_completed.map(|f| EventHandler::new(buffer_size, f));
        let on_reversal_recorded = hooks.on_reversal_recorded.map(|f| EventHandler::new(buffer_size, f));
        Self { on_purchase_completed, on_reversal_recorded }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_purchase_completed {
            result.purchase_completed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_reversal_recorded {
            result.reversal_recorded_producer.push(handler.subscribe());
        }
        result
    }

    /// Spawns a task per registered handler. Each task ends once all of its producers have been dropped.
    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_purchase_completed {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_reversal_recorded {
            tokio::spawn(handler.start_handler());
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_purchase_completed: Option<Handler<PurchaseCompletedEvent>>,
    pub on_reversal_recorded: Option<Handler<ReversalRecordedEvent>>,
}

impl EventHooks {
    pub fn on_purchase_completed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PurchaseCompletedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_purchase_completed = Some(Arc::new(f));
        self
    }

    pub fn on_reversal_recorded<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(ReversalRecordedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_reversal_recorded = Some(Arc::new(f));
        self
    }
}
