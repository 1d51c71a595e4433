mod test_call_not_established;
mod test_connect_no_match;
mod test_connect_reaches_in_call;
mod test_remote_stop;
mod test_stray_messages;
