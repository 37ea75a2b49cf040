use std::fmt::Write as _;

use dapp_core::view::ScreenView;
use shared::protocol::Receipt;

pub fn render_view(view: &ScreenView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "screen:  {}", view.kind);
    let _ = writeln!(out, "wallet:  {}", view.wallet.label());
    if let Some(badge) = view.badge {
        let _ = writeln!(out, "status:  {}", badge.label());
    }
    if let Some(details) = &view.details {
        let _ = writeln!(out, "account: {}", details.account);
        let _ = writeln!(
            out,
            "network: {} (chain {})",
            details.network_name, details.chain_id
        );
        let _ = writeln!(out, "balance: {} ETH", details.balance);
    }
    if let Some(form) = &view.donate_form {
        let _ = writeln!(
            out,
            "amount:  {} ETH (max {}, step {})",
            form.amount, form.max, form.step
        );
        let _ = writeln!(out, "[{}]", form.button_label());
    }
    if view.connecting {
        let _ = writeln!(out, "connecting...");
    } else if view.show_connect {
        let _ = writeln!(out, "[Connect]");
    }
    out
}

pub fn render_receipt(receipt: &Receipt) -> String {
    let outcome = if receipt.status { "confirmed" } else { "reverted" };
    format!(
        "donation {outcome}: tx {} in block {} (gas {})",
        receipt.transaction_hash, receipt.block_number, receipt.gas_used
    )
}
