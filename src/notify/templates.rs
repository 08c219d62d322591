//! Trilingual notification templates. The customer's `language_code` picks
//! the rendering; anything unknown falls back to English.

use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    OrderCreated,
    OrderPaid,
    DeliveryScheduled,
    DeliveryReminder,
    OrderDelivered,
    OrderCancelled,
    SubscriptionRenewed,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 7] = [
        NotificationKind::OrderCreated,
        NotificationKind::OrderPaid,
        NotificationKind::DeliveryScheduled,
        NotificationKind::DeliveryReminder,
        NotificationKind::OrderDelivered,
        NotificationKind::OrderCancelled,
        NotificationKind::SubscriptionRenewed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::OrderCreated => "order_created",
            NotificationKind::OrderPaid => "order_paid",
            NotificationKind::DeliveryScheduled => "delivery_scheduled",
            NotificationKind::DeliveryReminder => "delivery_reminder",
            NotificationKind::OrderDelivered => "order_delivered",
            NotificationKind::OrderCancelled => "order_cancelled",
            NotificationKind::SubscriptionRenewed => "subscription_renewed",
        }
    }
}

/// Values substituted into the templates. Kinds ignore the fields they do
/// not mention.
#[derive(Debug, Clone, Default)]
pub struct TemplateArgs {
    pub order_number: String,
    pub total_amount: f64,
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_window: Option<String>,
    pub next_delivery_date: Option<NaiveDate>,
    pub points_earned: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMessage {
    pub title: String,
    pub body: String,
}

enum Lang {
    En,
    Uz,
    Ru,
}

fn lang_for(code: &str) -> Lang {
    match code {
        "uz" => Lang::Uz,
        "ru" => Lang::Ru,
        _ => Lang::En,
    }
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%d.%m.%Y").to_string())
        .unwrap_or_default()
}

pub fn render(kind: NotificationKind, language: &str, args: &TemplateArgs) -> RenderedMessage {
    let number = &args.order_number;
    let total = format!("{:.0}", args.total_amount);
    let date = format_date(args.scheduled_date);
    let window = args.scheduled_window.clone().unwrap_or_default();
    let next_date = format_date(args.next_delivery_date);
    let points = args.points_earned;

    let (title, body) = match (kind, lang_for(language)) {
        (NotificationKind::OrderCreated, Lang::En) => (
            "Order received".to_string(),
            format!("Your order {number} for {total} UZS has been received. We will confirm it shortly."),
        ),
        (NotificationKind::OrderCreated, Lang::Uz) => (
            "Buyurtma qabul qilindi".to_string(),
            format!("Buyurtmangiz {number} ({total} so'm) qabul qilindi. Tez orada tasdiqlaymiz."),
        ),
        (NotificationKind::OrderCreated, Lang::Ru) => (
            "Заказ принят".to_string(),
            format!("Ваш заказ {number} на {total} сум принят. Мы скоро подтвердим его."),
        ),

        (NotificationKind::OrderPaid, Lang::En) => (
            "Payment received".to_string(),
            format!("Payment for order {number} has been received. Thank you!"),
        ),
        (NotificationKind::OrderPaid, Lang::Uz) => (
            "To'lov qabul qilindi".to_string(),
            format!("{number} buyurtma uchun to'lov qabul qilindi. Rahmat!"),
        ),
        (NotificationKind::OrderPaid, Lang::Ru) => (
            "Оплата получена".to_string(),
            format!("Оплата заказа {number} получена. Спасибо!"),
        ),

        (NotificationKind::DeliveryScheduled, Lang::En) => (
            "Delivery scheduled".to_string(),
            format!("Order {number} will be delivered on {date} between {window}."),
        ),
        (NotificationKind::DeliveryScheduled, Lang::Uz) => (
            "Yetkazib berish rejalashtirildi".to_string(),
            format!("{number} buyurtma {date} kuni {window} oralig'ida yetkaziladi."),
        ),
        (NotificationKind::DeliveryScheduled, Lang::Ru) => (
            "Доставка запланирована".to_string(),
            format!("Заказ {number} будет доставлен {date} в интервале {window}."),
        ),

        (NotificationKind::DeliveryReminder, Lang::En) => (
            "Delivery tomorrow".to_string(),
            format!("Reminder: order {number} arrives tomorrow between {window}. Please be available."),
        ),
        (NotificationKind::DeliveryReminder, Lang::Uz) => (
            "Ertaga yetkazib berish".to_string(),
            format!("Eslatma: {number} buyurtma ertaga {window} oralig'ida yetkaziladi."),
        ),
        (NotificationKind::DeliveryReminder, Lang::Ru) => (
            "Доставка завтра".to_string(),
            format!("Напоминание: заказ {number} будет доставлен завтра в интервале {window}."),
        ),

        (NotificationKind::OrderDelivered, Lang::En) => (
            "Order delivered".to_string(),
            format!("Order {number} has been delivered. You earned {points} loyalty points. Thank you for choosing AquaPure!"),
        ),
        (NotificationKind::OrderDelivered, Lang::Uz) => (
            "Buyurtma yetkazildi".to_string(),
            format!("{number} buyurtma yetkazildi. Siz {points} sodiqlik balini yig'dingiz. AquaPure'ni tanlaganingiz uchun rahmat!"),
        ),
        (NotificationKind::OrderDelivered, Lang::Ru) => (
            "Заказ доставлен".to_string(),
            format!("Заказ {number} доставлен. Вам начислено {points} бонусных баллов. Спасибо, что выбрали AquaPure!"),
        ),

        (NotificationKind::OrderCancelled, Lang::En) => (
            "Order cancelled".to_string(),
            format!("Order {number} has been cancelled. Reserved stock and loyalty points were returned."),
        ),
        (NotificationKind::OrderCancelled, Lang::Uz) => (
            "Buyurtma bekor qilindi".to_string(),
            format!("{number} buyurtma bekor qilindi. Zaxira va ballar qaytarildi."),
        ),
        (NotificationKind::OrderCancelled, Lang::Ru) => (
            "Заказ отменён".to_string(),
            format!("Заказ {number} отменён. Товар и баллы возвращены."),
        ),

        (NotificationKind::SubscriptionRenewed, Lang::En) => (
            "Subscription renewed".to_string(),
            format!("Your subscription created order {number}. Next delivery: {next_date}."),
        ),
        (NotificationKind::SubscriptionRenewed, Lang::Uz) => (
            "Obuna yangilandi".to_string(),
            format!("Obunangiz bo'yicha {number} buyurtma yaratildi. Keyingi yetkazish: {next_date}."),
        ),
        (NotificationKind::SubscriptionRenewed, Lang::Ru) => (
            "Подписка продлена".to_string(),
            format!("По вашей подписке создан заказ {number}. Следующая доставка: {next_date}."),
        ),
    };

    RenderedMessage { title, body }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_args() -> TemplateArgs {
        TemplateArgs {
            order_number: "ORD-20250714-1A2B3C".into(),
            total_amount: 105_000.0,
            scheduled_date: NaiveDate::from_ymd_opt(2025, 7, 15),
            scheduled_window: Some("09:00-11:00".into()),
            next_delivery_date: NaiveDate::from_ymd_opt(2025, 7, 21),
            points_earned: 105,
        }
    }

    #[test]
    fn every_kind_renders_in_every_language() {
        let args = sample_args();
        for kind in NotificationKind::ALL {
            for language in ["en", "uz", "ru"] {
                let message = render(kind, language, &args);
                assert!(!message.title.is_empty(), "{kind:?}/{language} title empty");
                assert!(
                    message.body.contains("ORD-20250714-1A2B3C"),
                    "{kind:?}/{language} body misses the order number"
                );
            }
        }
    }

    #[test]
    fn unknown_language_falls_back_to_english() {
        let args = sample_args();
        let fallback = render(NotificationKind::OrderPaid, "de", &args);
        let english = render(NotificationKind::OrderPaid, "en", &args);
        assert_eq!(fallback, english);
    }

    #[test]
    fn scheduled_templates_mention_date_and_window() {
        let args = sample_args();
        let message = render(NotificationKind::DeliveryScheduled, "en", &args);
        assert!(message.body.contains("15.07.2025"));
        assert!(message.body.contains("09:00-11:00"));
    }

    #[test]
    fn amounts_render_as_whole_sums() {
        let args = sample_args();
        let message = render(NotificationKind::OrderCreated, "en", &args);
        assert!(message.body.contains("105000 UZS"));
    }
}
