// src/services/pricing.rs
//
// Cálculos puros do motor de vendas: linhas, totais, conciliação de
// pagamentos, valores de estorno e numeração. Nada aqui toca o banco.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        money::{percentage_of, round_money, MONEY_TOLERANCE},
    },
    models::sales::{PaymentInput, PaymentMethod},
};

#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub discount_percentage: Decimal,
    pub gst_rate: Decimal,
    /// Subtotal da linha já com o desconto percentual aplicado
    pub line_subtotal: Decimal,
    pub gst_amount: Decimal,
    pub total_amount: Decimal,
}

/// Precifica uma linha: preço x qtd, desconto percentual, depois GST.
pub fn price_line(
    product_id: Uuid,
    unit_price: Decimal,
    quantity: i32,
    discount_percentage: Decimal,
    gst_rate: Decimal,
) -> PricedLine {
    let gross = unit_price * Decimal::from(quantity);
    let discount_factor = Decimal::ONE - discount_percentage / Decimal::ONE_HUNDRED;
    let line_subtotal = round_money(gross * discount_factor);
    let gst_amount = percentage_of(line_subtotal, gst_rate);

    PricedLine {
        product_id,
        quantity,
        unit_price,
        discount_percentage,
        gst_rate,
        line_subtotal,
        gst_amount,
        total_amount: line_subtotal + gst_amount,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SaleTotals {
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub gst_amount: Decimal,
    pub total_amount: Decimal,
}

/// total = (subtotal - desconto da venda) + soma do GST das linhas.
pub fn compute_totals(lines: &[PricedLine], discount_amount: Decimal) -> Result<SaleTotals, AppError> {
    let subtotal: Decimal = lines.iter().map(|l| l.line_subtotal).sum();
    let gst_amount: Decimal = lines.iter().map(|l| l.gst_amount).sum();
    let discount_amount = round_money(discount_amount);

    if discount_amount.is_sign_negative() {
        return Err(AppError::validation("discount_amount", "O desconto não pode ser negativo."));
    }
    if discount_amount > subtotal {
        return Err(AppError::validation(
            "discount_amount",
            "O desconto não pode ser maior que o subtotal da venda.",
        ));
    }

    Ok(SaleTotals {
        subtotal,
        discount_amount,
        gst_amount,
        total_amount: subtotal - discount_amount + gst_amount,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedPayment {
    pub method: PaymentMethod,
    pub amount: Decimal,
    pub tendered_amount: Option<Decimal>,
    pub change_amount: Decimal,
    pub reference_number: Option<String>,
}

/// Confere os pagamentos contra o total e devolve as linhas a gravar.
///
/// - `mixed`: a soma das parcelas deve bater com o total (tolerância 0,01).
/// - demais: uma parcela com valor >= total - 0,01; grava-se o total como
///   valor pago e o excedente como troco. Sem parcela, paga-se o total.
pub fn reconcile_payments(
    method: PaymentMethod,
    details: &[PaymentInput],
    total: Decimal,
) -> Result<Vec<PlannedPayment>, AppError> {
    if method == PaymentMethod::Mixed {
        if details.len() < 2 {
            return Err(AppError::PaymentError(
                "Pagamento misto exige ao menos 2 formas de pagamento.".into(),
            ));
        }
        let paid: Decimal = details.iter().map(|d| d.amount).sum();
        if (paid - total).abs() > MONEY_TOLERANCE {
            return Err(AppError::PaymentError(format!(
                "A soma dos pagamentos ({}) não confere com o total da venda ({}).",
                paid.round_dp(2),
                total
            )));
        }
        return Ok(details
            .iter()
            .map(|d| PlannedPayment {
                method: d.method,
                amount: round_money(d.amount),
                tendered_amount: None,
                change_amount: Decimal::ZERO,
                reference_number: d.reference_number.clone(),
            })
            .collect());
    }

    match details {
        [] => Ok(vec![PlannedPayment {
            method,
            amount: total,
            tendered_amount: None,
            change_amount: Decimal::ZERO,
            reference_number: None,
        }]),
        [detail] => {
            if detail.amount < total - MONEY_TOLERANCE {
                return Err(AppError::PaymentError(format!(
                    "Valor pago ({}) é menor que o total da venda ({}).",
                    detail.amount.round_dp(2),
                    total
                )));
            }
            let tendered = round_money(detail.amount);
            Ok(vec![PlannedPayment {
                method,
                amount: total,
                tendered_amount: Some(tendered),
                change_amount: (tendered - total).max(Decimal::ZERO),
                reference_number: detail.reference_number.clone(),
            }])
        }
        _ => Err(AppError::PaymentError(
            "Apenas pagamentos mistos aceitam mais de uma forma de pagamento.".into(),
        )),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefundLineAmount {
    pub amount: Decimal,
    pub gst_amount: Decimal,
}

/// Valor proporcional do estorno de `quantity` unidades de um item.
///
/// Quando o estorno zera o saldo do item, devolve exatamente o que falta
/// (total - já estornado), para que a soma dos estornos nunca passe do total.
pub fn refund_line_amount(
    item_total: Decimal,
    item_gst: Decimal,
    item_quantity: i32,
    already_refunded_quantity: i32,
    already_refunded_amount: Decimal,
    already_refunded_gst: Decimal,
    quantity: i32,
) -> Result<RefundLineAmount, AppError> {
    let remaining = item_quantity - already_refunded_quantity;
    if quantity < 1 || quantity > remaining {
        return Err(AppError::RefundError(format!(
            "Quantidade de estorno inválida: solicitado {}, disponível {}.",
            quantity, remaining
        )));
    }

    if quantity == remaining {
        return Ok(RefundLineAmount {
            amount: item_total - already_refunded_amount,
            gst_amount: item_gst - already_refunded_gst,
        });
    }

    let qty = Decimal::from(quantity);
    let sold = Decimal::from(item_quantity);
    Ok(RefundLineAmount {
        amount: round_money(item_total * qty / sold),
        gst_amount: round_money(item_gst * qty / sold),
    })
}

/// `SL` + AAAAMMDD + sequência do dia com 4 dígitos.
pub fn format_sale_number(day: NaiveDate, sequence: i32) -> String {
    format!("SL{}{:04}", day.format("%Y%m%d"), sequence)
}

/// `RF<original>`; estornos seguintes da mesma venda recebem `-2`, `-3`, ...
pub fn refund_sale_number(original: &str, previous_refunds: i64) -> String {
    if previous_refunds == 0 {
        format!("RF{}", original)
    } else {
        format!("RF{}-{}", original, previous_refunds + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn cash(amount: Decimal) -> PaymentInput {
        PaymentInput { method: PaymentMethod::Cash, amount, reference_number: None }
    }

    #[test]
    fn test_two_units_at_100_with_18_percent_gst() {
        let line = price_line(Uuid::nil(), dec!(100), 2, Decimal::ZERO, dec!(18));
        assert_eq!(line.line_subtotal, dec!(200.00));
        assert_eq!(line.gst_amount, dec!(36.00));
        assert_eq!(line.total_amount, dec!(236.00));

        let totals = compute_totals(&[line], Decimal::ZERO).unwrap();
        assert_eq!(totals.subtotal, dec!(200.00));
        assert_eq!(totals.gst_amount, dec!(36.00));
        assert_eq!(totals.total_amount, dec!(236.00));

        let payments = reconcile_payments(PaymentMethod::Cash, &[cash(dec!(236.00))], totals.total_amount).unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].amount, dec!(236.00));
        assert_eq!(payments[0].change_amount, Decimal::ZERO);
    }

    #[test]
    fn test_underpayment_is_rejected() {
        let err = reconcile_payments(PaymentMethod::Cash, &[cash(dec!(200.00))], dec!(236.00)).unwrap_err();
        assert_eq!(err.code(), "PAYMENT_ERROR");
    }

    #[test]
    fn test_one_cent_short_is_tolerated() {
        let payments = reconcile_payments(PaymentMethod::Cash, &[cash(dec!(235.99))], dec!(236.00)).unwrap();
        assert_eq!(payments[0].amount, dec!(236.00));
        assert_eq!(payments[0].tendered_amount, Some(dec!(235.99)));
    }

    #[test]
    fn test_overpayment_records_change() {
        let payments = reconcile_payments(PaymentMethod::Cash, &[cash(dec!(300))], dec!(236.00)).unwrap();
        assert_eq!(payments[0].amount, dec!(236.00));
        assert_eq!(payments[0].tendered_amount, Some(dec!(300.00)));
        assert_eq!(payments[0].change_amount, dec!(64.00));
    }

    #[test]
    fn test_no_details_pays_exact_total() {
        let payments = reconcile_payments(PaymentMethod::Upi, &[], dec!(59.90)).unwrap();
        assert_eq!(payments[0].method, PaymentMethod::Upi);
        assert_eq!(payments[0].amount, dec!(59.90));
    }

    #[test]
    fn test_mixed_payment_reconciliation() {
        let details = vec![
            cash(dec!(100)),
            PaymentInput { method: PaymentMethod::Card, amount: dec!(136.00), reference_number: Some("AUT123".into()) },
        ];
        let payments = reconcile_payments(PaymentMethod::Mixed, &details, dec!(236.00)).unwrap();
        let sum: Decimal = payments.iter().map(|p| p.amount).sum();
        assert_eq!(sum, dec!(236.00));
        assert_eq!(payments[1].reference_number.as_deref(), Some("AUT123"));

        let short = vec![cash(dec!(100)), cash(dec!(100))];
        assert_eq!(
            reconcile_payments(PaymentMethod::Mixed, &short, dec!(236.00)).unwrap_err().code(),
            "PAYMENT_ERROR"
        );
        assert!(reconcile_payments(PaymentMethod::Mixed, &[cash(dec!(236))], dec!(236.00)).is_err());
    }

    #[test]
    fn test_line_discount_and_rounding() {
        // 3 x 33.33 = 99.99; -10% = 89.991 -> 89.99; GST 5% = 4.4995 -> 4.50
        let line = price_line(Uuid::nil(), dec!(33.33), 3, dec!(10), dec!(5));
        assert_eq!(line.line_subtotal, dec!(89.99));
        assert_eq!(line.gst_amount, dec!(4.50));
        assert_eq!(line.total_amount, dec!(94.49));
    }

    #[test]
    fn test_sale_level_discount() {
        let a = price_line(Uuid::nil(), dec!(100), 1, Decimal::ZERO, dec!(18));
        let b = price_line(Uuid::nil(), dec!(50), 2, Decimal::ZERO, dec!(0));
        let totals = compute_totals(&[a, b], dec!(20)).unwrap();
        assert_eq!(totals.subtotal, dec!(200));
        assert_eq!(totals.gst_amount, dec!(18.00));
        assert_eq!(totals.total_amount, dec!(198.00));
        assert_eq!(totals.total_amount, totals.subtotal - totals.discount_amount + totals.gst_amount);

        let line = price_line(Uuid::nil(), dec!(10), 1, Decimal::ZERO, dec!(0));
        assert_eq!(compute_totals(&[line], dec!(11)).unwrap_err().code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_refund_is_proportional() {
        // Item: 3 unidades, total 118.00 (GST 18.00)
        let r = refund_line_amount(dec!(118.00), dec!(18.00), 3, 0, Decimal::ZERO, Decimal::ZERO, 1).unwrap();
        assert_eq!(r.amount, dec!(39.33));
        assert_eq!(r.gst_amount, dec!(6.00));
    }

    #[test]
    fn test_last_refund_takes_the_remainder() {
        let first = refund_line_amount(dec!(10.01), dec!(0), 2, 0, Decimal::ZERO, Decimal::ZERO, 1).unwrap();
        assert_eq!(first.amount, dec!(5.01));
        let last = refund_line_amount(dec!(10.01), dec!(0), 2, 1, first.amount, Decimal::ZERO, 1).unwrap();
        assert_eq!(last.amount, dec!(5.00));
        assert_eq!(first.amount + last.amount, dec!(10.01));
    }

    #[test]
    fn test_refund_more_than_sold_is_rejected() {
        let err = refund_line_amount(dec!(200), dec!(0), 2, 0, Decimal::ZERO, Decimal::ZERO, 3).unwrap_err();
        assert_eq!(err.code(), "REFUND_ERROR");

        // Já estornou 1 de 2: pedir 2 excede
        let err = refund_line_amount(dec!(200), dec!(0), 2, 1, dec!(100), Decimal::ZERO, 2).unwrap_err();
        assert_eq!(err.code(), "REFUND_ERROR");
    }

    #[test]
    fn test_sale_number_formats() {
        let day = NaiveDate::from_ymd_opt(2025, 1, 9).unwrap();
        assert_eq!(format_sale_number(day, 7), "SL202501090007");
        assert_eq!(format_sale_number(day, 12345), "SL2025010912345");
        assert_eq!(refund_sale_number("SL202501090007", 0), "RFSL202501090007");
        assert_eq!(refund_sale_number("SL202501090007", 1), "RFSL202501090007-2");
    }
}
