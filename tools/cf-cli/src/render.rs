//! Plain-text rendering of client state.

use cf_campaign_client::{
    format_ether, format_units, ActionEvent, ActionKind, ActionPhase, Balances, CampaignView,
    ConnectionInfo, Phase,
};

/// "2d 3h", "14m 5s", "ended".
pub fn time_left(secs: u64) -> String {
    if secs == 0 {
        return "ended".to_string();
    }
    let (days, hours, minutes, seconds) = (
        secs / 86_400,
        secs % 86_400 / 3_600,
        secs % 3_600 / 60,
        secs % 60,
    );
    if days > 0 {
        format!("{}d {}h left", days, hours)
    } else if hours > 0 {
        format!("{}h {}m left", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s left", minutes, seconds)
    } else {
        format!("{}s left", seconds)
    }
}

fn actions(view: &CampaignView) -> String {
    let kinds = view.permitted.kinds();
    if kinds.is_empty() {
        return String::new();
    }
    let names: Vec<String> = kinds.iter().map(|k| k.to_string()).collect();
    format!("  [{}]", names.join(", "))
}

/// One-line summary used by `list`.
pub fn campaign_line(view: &CampaignView, symbol: &str) -> String {
    let mut line = format!(
        "{:<4} {:<24} {:<22} {} / {} {} ({}%)  {}",
        view.id.to_string(),
        view.title,
        view.phase.to_string(),
        format_ether(view.raised),
        format_ether(view.goal),
        symbol,
        view.progress_percent(),
        time_left(view.time_left),
    );
    if !view.contribution.is_zero() {
        line.push_str(&format!("  you: {}", format_ether(view.contribution)));
    }
    line.push_str(&actions(view));
    line
}

/// Multi-line view used by `show`.
pub fn campaign_detail(view: &CampaignView, symbol: &str) -> String {
    let creator = if view.is_creator {
        format!("{:#x} (you)", view.creator)
    } else {
        format!("{:#x}", view.creator)
    };
    let outcome = match view.phase {
        Phase::FinalizedSuccessful => "Goal reached",
        Phase::FinalizedFailed => "Goal not reached",
        Phase::AwaitingFinalization => "Waiting to be finalized",
        Phase::Active => "Accepting contributions",
    };
    format!(
        "Campaign {}: {}\n  Creator:      {}\n  Goal:         {} {}\n  Raised:       {} {} ({}%)\n  Deadline:     {} ({})\n  Status:       {}\n  Contributed:  {} {}{}",
        view.id,
        view.title,
        creator,
        format_ether(view.goal),
        symbol,
        format_ether(view.raised),
        symbol,
        view.progress_percent(),
        view.deadline,
        time_left(view.time_left),
        outcome,
        format_ether(view.contribution),
        symbol,
        actions(view),
    )
}

/// Output of `status`.
pub fn connection(info: &ConnectionInfo) -> String {
    let network = if info.on_expected_network {
        format!("{}", info.network_id)
    } else {
        format!(
            "{} (expected {})",
            info.network_id, info.expected_network_id
        )
    };
    format!("Account: {:#x}\nNetwork: {}", info.identity, network)
}

/// Output of `balance`.
pub fn balances(balances: &Balances, native_symbol: &str) -> String {
    let mut out = format!(
        "Account: {:#x}\n{}: {}",
        balances.identity,
        native_symbol,
        format_ether(balances.native)
    );
    if let Some(token) = &balances.token {
        out.push_str(&format!(
            "\n{}: {}",
            token.symbol,
            format_units(token.amount, token.decimals)
        ));
    }
    out
}

/// Progress message for one action event.
pub fn progress(event: &ActionEvent) -> String {
    match event.phase {
        ActionPhase::Submitting => "Sending transaction...".to_string(),
        ActionPhase::AwaitingSettlement => match event.tx_hash {
            Some(tx) => format!("Waiting for confirmation (tx {:#x})...", tx),
            None => "Waiting for confirmation...".to_string(),
        },
        ActionPhase::Succeeded => match event.key.kind {
            ActionKind::Contribute => "Contributed!",
            ActionKind::Finalize => "Campaign finalized!",
            ActionKind::ClaimRefund => "Refund claimed!",
            ActionKind::CreateCampaign => "Campaign created!",
        }
        .to_string(),
        ActionPhase::Failed => format!(
            "Failed: {}",
            event.error.as_deref().unwrap_or("unknown error")
        ),
        ActionPhase::Idle => String::new(),
    }
}
