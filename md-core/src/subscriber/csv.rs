//! Loads channel definitions from a 16-column CSV, one row per link:
//! `id, enabled, tcpIP, tcpPort, tcpIP2, tcpPort2, udpIP, udpPort, udpIP2,`
//! `udpPort2, resendIP, resendPort, resendIP2, resendPort2, tcpUsername,`
//! `tcpPassword`.

use anyhow::{anyhow, Context, Result};
use std::net::SocketAddr;

use super::config::ChannelConfig;

const EXPECTED_COLUMNS: usize = 16;

pub fn parse_channels(csv: &str) -> Result<Vec<ChannelConfig>> {
    csv.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .enumerate()
        .map(|(row, line)| parse_row(row, line))
        .collect()
}

fn parse_row(row: usize, line: &str) -> Result<ChannelConfig> {
    let cols: Vec<&str> = line.split(',').map(str::trim).collect();
    if cols.len() != EXPECTED_COLUMNS {
        return Err(anyhow!(
            "channel CSV row {}: expected {} columns, found {}",
            row,
            EXPECTED_COLUMNS,
            cols.len()
        ));
    }

    let addr = |ip: &str, port: &str, field: &str| -> Result<SocketAddr> {
        format!("{}:{}", ip, port)
            .parse()
            .with_context(|| format!("channel CSV row {}: invalid {} address", row, field))
    };

    Ok(ChannelConfig {
        id: cols[0].to_string(),
        enabled: cols[1].eq_ignore_ascii_case("true") || cols[1] == "1",
        tcp_primary: addr(cols[2], cols[3], "tcp_primary")?,
        tcp_backup: addr(cols[4], cols[5], "tcp_backup")?,
        udp_primary: addr(cols[6], cols[7], "udp_primary")?,
        udp_backup: addr(cols[8], cols[9], "udp_backup")?,
        resend_primary: addr(cols[10], cols[11], "resend_primary")?,
        resend_backup: addr(cols[12], cols[13], "resend_backup")?,
        username: cols[14].to_string(),
        password: cols[15].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> String {
        "ch1,true,127.0.0.1,1001,127.0.0.1,1002,127.0.0.1,2001,127.0.0.1,2002,\
         127.0.0.1,3001,127.0.0.1,3002,user,pass"
            .to_string()
    }

    #[test]
    fn parses_a_well_formed_row() {
        let channels = parse_channels(&sample_row()).unwrap();
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].id, "ch1");
        assert!(channels[0].enabled);
        assert_eq!(channels[0].tcp_primary.port(), 1001);
    }

    #[test]
    fn skips_blank_lines_and_comments() {
        let csv = format!("# header\n\n{}\n", sample_row());
        let channels = parse_channels(&csv).unwrap();
        assert_eq!(channels.len(), 1);
    }

    #[test]
    fn rejects_wrong_column_count() {
        assert!(parse_channels("a,b,c").is_err());
    }
}
