//! Integration tests for the record parser.

use cmdchain::{parse_key_value_records, TEXT_KEY};

#[test]
fn header_with_extra_values_synthesizes_prefix_keys_from_the_left() {
    // Three real keys against four values: the leftmost value binds to the
    // synthesized PREFIX_1, the remaining three bind to the real keys from
    // the right.
    let data = "\
CHASSIS/SLOT/UNIT 1/2/3/4\r\n\
Model Name = OS6860\r\n\
Serial Number = T42\r\n";
    let records = parse_key_value_records(data, None, None, "CHASSIS", '=');
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record["PREFIX_1"], "1");
    assert_eq!(record["CHASSIS"], "2");
    assert_eq!(record["SLOT"], "3");
    assert_eq!(record["UNIT"], "4");
    assert_eq!(record["MODEL_NAME"], "OS6860");
    assert_eq!(record["SERIAL_NUMBER"], "T42");
}

#[test]
fn multiple_blocks_become_separate_ordered_records() {
    let data = "\
PORT 1/1\r\n\
Admin Status = up\r\n\
PORT 1/2\r\n\
Admin Status = down\r\n\
Link = none\r\n";
    let records = parse_key_value_records(data, None, None, "PORT", '=');
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["ADMIN_STATUS"], "up");
    assert_eq!(records[1]["ADMIN_STATUS"], "down");
    assert_eq!(records[1]["LINK"], "none");
    // Field order within a record follows the input.
    let keys: Vec<&str> = records[1].keys().map(String::as_str).collect();
    let admin = keys.iter().position(|&k| k == "ADMIN_STATUS").unwrap();
    let link = keys.iter().position(|&k| k == "LINK").unwrap();
    assert!(admin < link);
}

#[test]
fn free_form_lines_collect_into_a_text_field() {
    let data = "\
ALARM LIST 3\r\n\
Severity = minor\r\n\
fan tray 2 is running at reduced speed\r\n\
check airflow and filters\r\n";
    let records = parse_key_value_records(data, None, None, "ALARM", '=');
    let text = &records[0][TEXT_KEY];
    assert!(text.contains("reduced speed"));
    assert!(text.contains("check airflow"));
}

#[test]
fn key_without_value_prefixes_following_fields() {
    let data = "\
SENSOR TABLE 1\r\n\
CPU =\r\n\
Load = 17\r\n\
Temp = 41\r\n";
    let records = parse_key_value_records(data, None, None, "SENSOR", '=');
    let record = &records[0];
    assert_eq!(record["CPU_LOAD"], "17");
    assert_eq!(record["CPU_TEMP"], "41");
}

#[test]
fn command_echo_and_prompt_are_scrubbed() {
    let data = "\
-> show port config\r\n\
PORT 1/1\r\n\
Admin Status = up\r\n\
-> \r\n";
    let records =
        parse_key_value_records(data, Some("show port config"), Some("->"), "PORT", '=');
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["ADMIN_STATUS"], "up");
}

#[test]
fn session_config_block_parses_to_expected_fields() {
    let data = "\
show session config\r\n\
Cli Default Prompt                 = ->\r\n\
Cli Inactivity Timer in minutes    = 4\r\n\
Login Timer in seconds             = 5\r\n\
Maximum number of Login Attempts   = 3\r\n";
    let records = parse_key_value_records(data, None, None, "SHOW SESSION CONFIG", '=');
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record["CLI_DEFAULT_PROMPT"], "->");
    assert_eq!(record["CLI_INACTIVITY_TIMER_IN_MINUTES"], "4");
    assert_eq!(record["LOGIN_TIMER_IN_SECONDS"], "5");
    assert_eq!(record["MAXIMUM_NUMBER_OF_LOGIN_ATTEMPTS"], "3");
}

#[test]
fn comma_separated_pairs_share_a_line() {
    let data = "GROUP A\r\nRx = 10, Tx = 20, Errors = 0\r\n";
    let records = parse_key_value_records(data, None, None, "GROUP", '=');
    let record = &records[0];
    assert_eq!(record["RX"], "10");
    assert_eq!(record["TX"], "20");
    assert_eq!(record["ERRORS"], "0");
}
