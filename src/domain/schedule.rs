use super::order::{OrderId, OrderStatus};
use super::role::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Links a chef, a date and an order. Progress is read from the order itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: Uuid,
    pub chef: UserId,
    pub date: DateTime<Utc>,
    pub order: OrderId,
    pub assigned_by: UserId,
}

impl Schedule {
    pub fn new(chef: UserId, date: DateTime<Utc>, order: OrderId, assigned_by: UserId) -> Self {
        Self {
            id: Uuid::new_v4(),
            chef,
            date,
            order,
            assigned_by,
        }
    }

    /// Moves an existing assignment to another chef or date.
    pub fn reassign(&mut self, chef: UserId, date: DateTime<Utc>, assigned_by: UserId) {
        self.chef = chef;
        self.date = date;
        self.assigned_by = assigned_by;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleView {
    pub schedule: Schedule,
    pub order_status: OrderStatus,
    pub completed: bool,
}

impl ScheduleView {
    pub fn new(schedule: Schedule, order_status: OrderStatus) -> Self {
        Self {
            schedule,
            order_status,
            completed: order_status == OrderStatus::Delivered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_follows_order_status() {
        let schedule = Schedule::new(
            UserId::new("chef-1"),
            Utc::now(),
            OrderId::generate(),
            UserId::new("mgr-1"),
        );
        assert!(!ScheduleView::new(schedule.clone(), OrderStatus::Ready).completed);
        assert!(ScheduleView::new(schedule, OrderStatus::Delivered).completed);
    }
}
