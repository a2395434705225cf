//! Minimal wire parsing: just enough of each supported protocol's
//! header to evaluate the [`fw_profile::protocols::StatefulPredicate`]
//! set a queue was configured with. NFQUEUE hands userspace the IP
//! packet with no link-layer header, so parsing starts at the IP
//! version nibble (ARP is the one exception — profiles that match on
//! it run on a `family arp` hook and NFQUEUE hands back the raw ARP
//! frame instead).

use std::net::{Ipv4Addr, Ipv6Addr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum L4Protocol {
    Tcp,
    Udp,
    Icmp,
    Icmpv6,
    Igmp,
    Other(u8),
}

#[derive(Debug, Clone)]
pub struct IpHeader {
    pub src: std::net::IpAddr,
    pub dst: std::net::IpAddr,
    pub protocol: L4Protocol,
    pub total_len: u32,
}

fn l4_from_number(n: u8) -> L4Protocol {
    match n {
        6 => L4Protocol::Tcp,
        17 => L4Protocol::Udp,
        1 => L4Protocol::Icmp,
        58 => L4Protocol::Icmpv6,
        2 => L4Protocol::Igmp,
        other => L4Protocol::Other(other),
    }
}

/// Parses the IPv4 or IPv6 header from `data`, dispatching on the
/// version nibble. Returns the header plus the byte offset where the
/// L4 payload begins.
pub fn parse_ip(data: &[u8]) -> Option<(IpHeader, usize)> {
    let version = data.first()? >> 4;
    match version {
        4 => parse_ipv4(data),
        6 => parse_ipv6(data),
        _ => None,
    }
}

fn parse_ipv4(data: &[u8]) -> Option<(IpHeader, usize)> {
    if data.len() < 20 {
        return None;
    }
    let ihl = (data[0] & 0x0f) as usize * 4;
    if data.len() < ihl {
        return None;
    }
    let total_len = u16::from_be_bytes([data[2], data[3]]) as u32;
    let protocol = l4_from_number(data[9]);
    let src = Ipv4Addr::new(data[12], data[13], data[14], data[15]);
    let dst = Ipv4Addr::new(data[16], data[17], data[18], data[19]);
    Some((
        IpHeader {
            src: src.into(),
            dst: dst.into(),
            protocol,
            total_len,
        },
        ihl,
    ))
}

fn parse_ipv6(data: &[u8]) -> Option<(IpHeader, usize)> {
    if data.len() < 40 {
        return None;
    }
    let payload_len = u16::from_be_bytes([data[4], data[5]]) as u32;
    let protocol = l4_from_number(data[6]);
    let src = Ipv6Addr::from(<[u8; 16]>::try_from(&data[8..24]).ok()?);
    let dst = Ipv6Addr::from(<[u8; 16]>::try_from(&data[24..40]).ok()?);
    Some((
        IpHeader {
            src: src.into(),
            dst: dst.into(),
            protocol,
            total_len: payload_len + 40,
        },
        40,
    ))
}

pub struct TransportHeader {
    pub sport: u16,
    pub dport: u16,
}

pub fn parse_tcp(data: &[u8]) -> Option<(TransportHeader, usize)> {
    if data.len() < 20 {
        return None;
    }
    let sport = u16::from_be_bytes([data[0], data[1]]);
    let dport = u16::from_be_bytes([data[2], data[3]]);
    let data_offset = (data[12] >> 4) as usize * 4;
    Some((TransportHeader { sport, dport }, data_offset.max(20)))
}

pub fn parse_udp(data: &[u8]) -> Option<(TransportHeader, usize)> {
    if data.len() < 8 {
        return None;
    }
    let sport = u16::from_be_bytes([data[0], data[1]]);
    let dport = u16::from_be_bytes([data[2], data[3]]);
    Some((TransportHeader { sport, dport }, 8))
}

/// A DNS message's QR bit, first question's QTYPE (numeric, rendered
/// as its mnemonic where known), and question name.
pub struct DnsMessage {
    pub is_response: bool,
    pub qtype: String,
    pub qname: String,
}

fn qtype_name(n: u16) -> String {
    match n {
        1 => "A".to_string(),
        28 => "AAAA".to_string(),
        5 => "CNAME".to_string(),
        12 => "PTR".to_string(),
        16 => "TXT".to_string(),
        33 => "SRV".to_string(),
        other => other.to_string(),
    }
}

pub fn parse_dns(data: &[u8]) -> Option<DnsMessage> {
    if data.len() < 12 {
        return None;
    }
    let flags = u16::from_be_bytes([data[2], data[3]]);
    let is_response = flags & 0x8000 != 0;
    let qdcount = u16::from_be_bytes([data[4], data[5]]);
    if qdcount == 0 {
        return Some(DnsMessage {
            is_response,
            qtype: String::new(),
            qname: String::new(),
        });
    }
    let mut offset = 12;
    let mut labels = Vec::new();
    loop {
        let len = *data.get(offset)? as usize;
        if len == 0 {
            offset += 1;
            break;
        }
        // Compressed name pointers aren't expected in the question
        // section of a well-formed query/response; treat as malformed.
        if len & 0xc0 != 0 {
            return None;
        }
        offset += 1;
        let label = data.get(offset..offset + len)?;
        labels.push(String::from_utf8_lossy(label).to_string());
        offset += len;
    }
    let qtype_raw = u16::from_be_bytes([*data.get(offset)?, *data.get(offset + 1)?]);
    Some(DnsMessage {
        is_response,
        qtype: qtype_name(qtype_raw),
        qname: labels.join("."),
    })
}

/// Best-effort single-datagram HTTP parse: request line (method + URI)
/// when the payload starts with a method token, response status line
/// otherwise. Smart-home device traffic this classifier targets is
/// small enough to arrive in one packet; stream reassembly is out of
/// scope.
pub struct HttpMessage {
    pub is_request: bool,
    pub method: Option<String>,
    pub uri: Option<String>,
}

pub fn parse_http(data: &[u8]) -> Option<HttpMessage> {
    let text = std::str::from_utf8(data).ok()?;
    let first_line = text.lines().next()?;
    if let Some(rest) = first_line.strip_prefix("HTTP/") {
        let _ = rest;
        return Some(HttpMessage {
            is_request: false,
            method: None,
            uri: None,
        });
    }
    let mut parts = first_line.split_whitespace();
    let method = parts.next()?.to_string();
    let uri = parts.next()?.to_string();
    Some(HttpMessage {
        is_request: true,
        method: Some(method),
        uri: Some(uri),
    })
}

/// SSDP rides the same text-line format as HTTP (`NOTIFY * HTTP/1.1`,
/// `M-SEARCH * HTTP/1.1`, or `HTTP/1.1 200 OK` for a search response).
pub fn parse_ssdp(data: &[u8]) -> Option<HttpMessage> {
    parse_http(data)
}

pub struct CoapMessage {
    pub msg_type: String,
    pub method: String,
    pub uri: String,
}

/// Reads a CoAP option's extended delta/length field starting at
/// `data[offset]` when the 4-bit nibble read `13` or `14` (RFC 7252
/// §3.1's one/two-byte extension encoding), returning the resolved
/// value and the offset just past it.
fn coap_option_ext(data: &[u8], offset: usize, nibble: u8) -> Option<(u32, usize)> {
    match nibble {
        13 => Some((*data.get(offset)? as u32 + 13, offset + 1)),
        14 => {
            let ext = u16::from_be_bytes([*data.get(offset)?, *data.get(offset + 1)?]);
            Some((ext as u32 + 269, offset + 2))
        }
        _ => Some((nibble as u32, offset)),
    }
}

/// Parses a CoAP message's type/code header plus its `uri`, rebuilt from
/// the `Uri-Path` (option 11) and `Uri-Query` (option 15) options in
/// wire order — `/`-prefixed for each path segment, `/?`-prefixed for
/// each query segment, the same assembly
/// `pcap_tweaker`'s CoAP tweaker uses to report a packet's URI.
pub fn parse_coap(data: &[u8]) -> Option<CoapMessage> {
    if data.len() < 4 {
        return None;
    }
    let msg_type = match (data[0] >> 4) & 0x03 {
        0 => "CON",
        1 => "NON",
        2 => "ACK",
        _ => "RST",
    }
    .to_string();
    let code = data[1];
    let method = match code {
        1 => "GET",
        2 => "POST",
        3 => "PUT",
        4 => "DELETE",
        _ => "OTHER",
    }
    .to_string();

    let token_len = (data[0] & 0x0f) as usize;
    let mut offset = 4 + token_len;
    let mut option_number: u32 = 0;
    let mut uri = String::new();

    while offset < data.len() {
        let first = data[offset];
        if first == 0xff {
            break;
        }
        offset += 1;
        let (delta, next) = coap_option_ext(data, offset, first >> 4)?;
        offset = next;
        let (length, next) = coap_option_ext(data, offset, first & 0x0f)?;
        offset = next;
        option_number += delta;
        let value = data.get(offset..offset + length as usize)?;
        offset += length as usize;

        match option_number {
            11 => {
                uri.push('/');
                uri.push_str(&String::from_utf8_lossy(value));
            }
            15 => {
                uri.push_str("/?");
                uri.push_str(&String::from_utf8_lossy(value));
            }
            _ => {}
        }
    }

    Some(CoapMessage { msg_type, method, uri })
}

pub struct DhcpMessage {
    pub message_type: String,
    pub client_mac: String,
}

fn dhcp_message_type_name(code: u8) -> Option<&'static str> {
    Some(match code {
        1 => "DHCPDISCOVER",
        2 => "DHCPOFFER",
        3 => "DHCPREQUEST",
        4 => "DHCPDECLINE",
        5 => "DHCPACK",
        6 => "DHCPNAK",
        7 => "DHCPRELEASE",
        8 => "DHCPINFORM",
        _ => return None,
    })
}

/// Parses a BOOTP/DHCP payload for the `chaddr` field (client MAC,
/// offset 28) and the option-53 message type, after checking the magic
/// cookie at offset 236. Grounded on `translator/protocols/dhcp.py`,
/// which reads the same two fields (`chaddr` and
/// `options.message_type`) off the parsed BOOTP packet.
pub fn parse_dhcp(data: &[u8]) -> Option<DhcpMessage> {
    if data.len() < 240 {
        return None;
    }
    if data[236..240] != [99, 130, 83, 99] {
        return None;
    }
    let mac_bytes = &data[28..34];
    let client_mac = mac_bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":");

    let mut offset = 240;
    let mut message_type = None;
    while offset < data.len() {
        let code = data[offset];
        if code == 255 {
            break;
        }
        if code == 0 {
            offset += 1;
            continue;
        }
        let len = *data.get(offset + 1)? as usize;
        let value = data.get(offset + 2..offset + 2 + len)?;
        if code == 53 && !value.is_empty() {
            message_type = dhcp_message_type_name(value[0]).map(str::to_string);
        }
        offset += 2 + len;
    }

    Some(DhcpMessage {
        message_type: message_type.unwrap_or_default(),
        client_mac,
    })
}

pub struct IgmpMessage {
    pub msg_type: String,
    pub group: std::net::Ipv4Addr,
}

pub fn parse_igmp(data: &[u8]) -> Option<IgmpMessage> {
    if data.len() < 8 {
        return None;
    }
    let msg_type = match data[0] {
        0x11 => "membership-query",
        0x16 => "membership-report",
        0x17 => "leave-group",
        0x22 => "membership-report",
        _ => "other",
    }
    .to_string();
    let group = Ipv4Addr::new(data[4], data[5], data[6], data[7]);
    Some(IgmpMessage { msg_type, group })
}
