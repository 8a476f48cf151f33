//! Output rendering: `--json` emits one object or array via
//! `serde_json::to_writer_pretty`; human mode is a small fixed-width table,
//! in the vein of the pack's CLI table writers but without the extra
//! dependency since the columns here are few and short.

use jobctl_core::job::{Job, Stats};

pub fn jobs_json(jobs: &[Job]) {
    serde_json::to_writer_pretty(std::io::stdout(), jobs).ok();
    println!();
}

pub fn jobs_table(jobs: &[Job]) {
    if jobs.is_empty() {
        println!("no jobs");
        return;
    }
    println!(
        "{:<36} {:<10} {:<8} {:<9} {:<22} {:<40}",
        "ID", "STATE", "PRIORITY", "ATTEMPTS", "RUN_AT", "COMMAND"
    );
    for job in jobs {
        println!(
            "{:<36} {:<10} {:<8} {:<9} {:<22} {:<40}",
            job.id,
            job.state.as_str(),
            job.priority,
            job.attempts,
            job.run_at.to_rfc3339(),
            truncate(&job.command, 40),
        );
    }
}

pub fn stats_json(stats: &Stats) {
    serde_json::to_writer_pretty(std::io::stdout(), stats).ok();
    println!();
}

pub fn stats_table(stats: &Stats) {
    println!("pending:    {}", stats.pending);
    println!("processing: {}", stats.processing);
    println!("completed:  {}", stats.completed);
    println!("dead:       {}", stats.dead);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() > max_len {
        let mut t: String = s.chars().take(max_len.saturating_sub(1)).collect();
        t.push('…');
        t
    } else {
        s.to_string()
    }
}
