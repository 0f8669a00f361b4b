use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::{bitwise, Agent};
use crate::message::Message;
use crate::registry::TopicRegistry;
use crate::Result;

/// The operator families the configuration loader can instantiate.
///
/// The names returned by [`OpKind::name`] are the stable identifiers used in
/// configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Add,
    Inc,
    And,
    Or,
    Xor,
    Not,
    Compare,
}

impl OpKind {
    pub const ALL: [OpKind; 7] = [
        OpKind::Add,
        OpKind::Inc,
        OpKind::And,
        OpKind::Or,
        OpKind::Xor,
        OpKind::Not,
        OpKind::Compare,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "add" => Some(OpKind::Add),
            "inc" => Some(OpKind::Inc),
            "and" => Some(OpKind::And),
            "or" => Some(OpKind::Or),
            "xor" => Some(OpKind::Xor),
            "not" => Some(OpKind::Not),
            "compare" => Some(OpKind::Compare),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OpKind::Add => "add",
            OpKind::Inc => "inc",
            OpKind::And => "and",
            OpKind::Or => "or",
            OpKind::Xor => "xor",
            OpKind::Not => "not",
            OpKind::Compare => "compare",
        }
    }

    /// How many input topics the operator consumes.
    pub fn input_arity(self) -> usize {
        match self {
            OpKind::Inc | OpKind::Not => 1,
            _ => 2,
        }
    }

    /// The summing operator forgets its inputs once it has published;
    /// the logical and comparison operators keep theirs armed.
    fn clears_after_publish(self) -> bool {
        matches!(self, OpKind::Add)
    }

    fn reduce(self, x: f64, y: f64) -> f64 {
        match self {
            OpKind::Add => x + y,
            OpKind::And => bitwise::and(x, y),
            OpKind::Or => bitwise::or(x, y),
            OpKind::Xor => bitwise::xor(x, y),
            OpKind::Compare => match x.total_cmp(&y) {
                Ordering::Greater => 1.0,
                Ordering::Less => -1.0,
                Ordering::Equal => 0.0,
            },
            _ => f64::NAN,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    X,
    Y,
}

#[derive(Debug, Default)]
struct SlotPair {
    x: f64,
    y: f64,
    x_set: bool,
    y_set: bool,
}

impl SlotPair {
    fn set(&mut self, slot: Slot, value: f64) {
        match slot {
            Slot::X => {
                self.x = value;
                self.x_set = true;
            }
            Slot::Y => {
                self.y = value;
                self.y_set = true;
            }
        }
    }

    fn unset(&mut self, slot: Slot) {
        match slot {
            Slot::X => self.x_set = false,
            Slot::Y => self.y_set = false,
        }
    }

    fn armed(&self) -> bool {
        self.x_set && self.y_set
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// One operator node of the dataflow graph.
///
/// Binary operators hold a pair of input slots and fire whenever both are
/// armed with a numeric value; unary operators fire per arrival. An agent
/// given fewer inputs or outputs than its kind requires silently no-ops.
pub struct OpAgent {
    kind: OpKind,
    inputs: Vec<String>,
    outputs: Vec<String>,
    registry: Arc<TopicRegistry>,
    slots: Mutex<SlotPair>,
}

impl OpAgent {
    pub fn new(
        kind: OpKind,
        inputs: Vec<String>,
        outputs: Vec<String>,
        registry: Arc<TopicRegistry>,
    ) -> Self {
        Self {
            kind,
            inputs,
            outputs,
            registry,
            slots: Mutex::new(SlotPair::default()),
        }
    }

    pub fn kind(&self) -> OpKind {
        self.kind
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    async fn emit(&self, value: f64) {
        let Some(out) = self.outputs.first() else {
            return;
        };
        debug!(agent = %self.kind.name(), topic = %out, value, "publishing result");
        self.registry
            .get(out)
            .await
            .publish(Message::from_num(value))
            .await;
    }

    async fn handle_unary(&self, msg: &Message) {
        if self.inputs.is_empty() || self.outputs.is_empty() {
            return;
        }
        let num = msg.num();
        if num.is_nan() {
            debug!(agent = %self.kind.name(), "dropping non-numeric input");
            return;
        }
        let result = match self.kind {
            OpKind::Inc => num + 1.0,
            OpKind::Not => bitwise::not(num),
            _ => return,
        };
        self.emit(result).await;
    }

    async fn handle_binary(&self, topic: &str, msg: &Message) {
        if self.inputs.len() < 2 || self.outputs.is_empty() {
            return;
        }
        let slot = if topic == self.inputs[0] {
            Slot::X
        } else if topic == self.inputs[1] {
            Slot::Y
        } else {
            return;
        };

        let num = msg.num();
        let fired = {
            let mut slots = self.slots.lock().await;
            if num.is_nan() {
                // The summing operator ignores non-numeric arrivals; the
                // persistent operators disarm the slot so a stale value
                // cannot keep re-triggering.
                if !self.kind.clears_after_publish() {
                    slots.unset(slot);
                }
                None
            } else {
                slots.set(slot, num);
                if slots.armed() {
                    let result = self.kind.reduce(slots.x, slots.y);
                    if self.kind.clears_after_publish() {
                        slots.clear();
                    }
                    Some(result)
                } else {
                    None
                }
            }
        };

        if let Some(result) = fired {
            self.emit(result).await;
        }
    }
}

#[async_trait]
impl Agent for OpAgent {
    fn name(&self) -> &str {
        self.kind.name()
    }

    async fn reset(&self) {
        self.slots.lock().await.clear();
    }

    async fn on_message(&self, topic: &str, msg: Message) {
        match self.kind.input_arity() {
            1 => self.handle_unary(&msg).await,
            _ => self.handle_binary(topic, &msg).await,
        }
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
