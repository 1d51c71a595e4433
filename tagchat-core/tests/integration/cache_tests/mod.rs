mod test_media_acquired_once;
