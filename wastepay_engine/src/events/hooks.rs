use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, OrderCancelledEvent, PaymentCompletedEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_cancelled_producer: Vec<EventProducer<OrderCancelledEvent>>,
    pub payment_completed_producer: Vec<EventProducer<PaymentCompletedEvent>>,
}

pub struct EventHandlers {
    pub on_order_cancelled: Option<EventHandler<OrderCancelledEvent>>,
    pub on_payment_completed: Option<EventHandler<PaymentCompletedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_cancelled = hooks.on_order_cancelled.map(|f| EventHandler::new(buffer_size, f));
        let on_payment_completed = hooks.on_payment_completed.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_cancelled, on_payment_completed }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_cancelled {
            result.order_cancelled_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_payment_completed {
            result.payment_completed_producer.push(handler.subscribe());
        }
        result
    }

    /// Spawns a task for each configured handler. Each task runs until every producer for its event is dropped.
    pub fn start_handlers(self) {
        if let Some(handler) = self.on_order_cancelled {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_payment_completed {
            tokio::spawn(handler.start_handler());
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_cancelled: Option<Handler<OrderCancelledEvent>>,
    pub on_payment_completed: Option<Handler<PaymentCompletedEvent>>,
}

impl EventHooks {
    pub fn on_order_cancelled<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderCancelledEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_cancelled = Some(Arc::new(f));
        self
    }

    pub fn on_payment_completed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PaymentCompletedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_payment_completed = Some(Arc::new(f));
        self
    }
}
